// Celebration once every cell has been mapped
//
// A fixed, open-loop routine. It never touches the pose or the map.

use tracing::info;

use crate::hardware::{self, Hardware, MotorCommand, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    Forward { millis: u32 },
    Backward { millis: u32 },
    Stop,
    Wait { millis: u32 },
    Turn(Turn),
}

pub const VICTORY_DANCE: [Maneuver; 10] = [
    Maneuver::Forward { millis: 600 },
    Maneuver::Stop,
    Maneuver::Wait { millis: 500 },
    Maneuver::Turn(Turn::left(20)),
    Maneuver::Forward { millis: 200 },
    Maneuver::Backward { millis: 200 },
    Maneuver::Turn(Turn::right(40)),
    Maneuver::Forward { millis: 200 },
    Maneuver::Backward { millis: 200 },
    Maneuver::Turn(Turn::right(320)),
];

pub fn perform<H: Hardware + ?Sized>(hw: &mut H) -> hardware::Result<()> {
    info!("Maze mapped, dancing");
    for maneuver in VICTORY_DANCE {
        match maneuver {
            Maneuver::Forward { millis } => hw.drive_forward(millis)?,
            Maneuver::Backward { millis } => hw.drive_backward(millis)?,
            Maneuver::Stop => hw.set_motors(MotorCommand::stop())?,
            Maneuver::Wait { millis } => hw.delay_millis(millis)?,
            Maneuver::Turn(turn) => hw.turn(turn)?,
        }
    }
    Ok(())
}
