// Serial driver for the robot's motion board
//
// Maps the `Hardware` capability onto the board protocol. The clock and
// sleeps are host-side; everything else is a round trip to the board.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::protocol::MotionBus;
use super::{
    EncoderChannel, Hardware, HardwareError, LineSensor, MotorCommand, ProximitySensor, Result,
    Turn, TurnDirection,
};

/// Board channel numbers for each proximity sensor
fn proximity_channel(sensor: ProximitySensor) -> u8 {
    match sensor {
        ProximitySensor::Left => 0,
        ProximitySensor::FrontLeft => 1,
        ProximitySensor::Front => 2,
        ProximitySensor::FrontRight => 3,
        ProximitySensor::Right => 4,
        ProximitySensor::Rear => 6,
    }
}

/// The real robot, reached over a serial link
pub struct SerialRobot {
    bus: MotionBus,
    started: Instant,
}

impl SerialRobot {
    /// Connect to the motion board on the specified serial port
    pub fn new(port: &str) -> Result<Self> {
        info!("Opening motion board on {}", port);
        let bus = MotionBus::open(port)?;
        Ok(Self {
            bus,
            started: Instant::now(),
        })
    }

    /// Check the board answers, then make sure the wheels are still
    pub fn initialize(&mut self) -> Result<()> {
        if !self.bus.ping()? {
            warn!("Motion board not responding to ping");
            return Err(HardwareError::Timeout {
                id: super::protocol::BOARD_ID,
            });
        }
        debug!("Motion board responding");
        self.stop()?;
        self.bus.reset_encoders()?;
        info!("Motion board initialized");
        Ok(())
    }
}

impl Hardware for SerialRobot {
    fn set_motors(&mut self, command: MotorCommand) -> Result<()> {
        self.bus.set_motors(command.left, command.right)
    }

    fn turn(&mut self, turn: Turn) -> Result<()> {
        let degrees = turn.degrees.min(i16::MAX as u16) as i16;
        match turn.direction {
            TurnDirection::Right => self.bus.turn(degrees),
            TurnDirection::Left => self.bus.turn(-degrees),
        }
    }

    fn drive_forward(&mut self, millis: u32) -> Result<()> {
        self.bus.drive_timed(millis.min(i16::MAX as u32) as i16)
    }

    fn drive_backward(&mut self, millis: u32) -> Result<()> {
        self.bus.drive_timed(-(millis.min(i16::MAX as u32) as i16))
    }

    fn read_proximity(&mut self, sensor: ProximitySensor) -> Result<i32> {
        self.bus
            .read_proximity(proximity_channel(sensor))
            .map(i32::from)
    }

    fn read_line(&mut self, sensor: LineSensor) -> Result<i32> {
        self.bus.read_line(sensor as u8).map(i32::from)
    }

    fn read_encoder(&mut self, channel: EncoderChannel) -> Result<i32> {
        let channel = match channel {
            EncoderChannel::Left => 0,
            EncoderChannel::Right => 1,
        };
        self.bus.read_encoder(channel).map(i32::from)
    }

    fn reset_encoders(&mut self) -> Result<()> {
        self.bus.reset_encoders()
    }

    fn read_ambient_light(&mut self) -> Result<i32> {
        self.bus.read_light().map(i32::from)
    }

    fn now_millis(&mut self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn delay_millis(&mut self, millis: u32) -> Result<()> {
        std::thread::sleep(Duration::from_millis(millis as u64));
        Ok(())
    }
}

impl Drop for SerialRobot {
    fn drop(&mut self) {
        // Try to stop the wheels when the driver goes away
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
