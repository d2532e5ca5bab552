// Deterministic 4x4 maze simulator
//
// The robot always travels along cell centre lines. Its position inside a
// cell is `progress`, measured in encoder ticks along the current heading
// from the cell's rear boundary (0) to its front boundary (`CELL_TICKS`).
// Floor lines straddle every open boundary between cells.
//
// Each `set_motors` call holds the command for one control period and
// integrates motion over it. Quarter turns snap the robot back onto the
// centre of its cell; turns smaller than 45 degrees only cost time.

use crate::explore::pose::{GridPosition, Orientation};

use super::{
    EncoderChannel, Hardware, LineSensor, MotorCommand, ProximitySensor, Result, Turn,
    TurnDirection,
};

/// Encoder ticks from one cell boundary to the next
pub const CELL_TICKS: i32 = 600;
/// Half the width of a floor line, in ticks
pub const LINE_HALF_WIDTH: i32 = 30;
/// Simulated time covered by one motor command
pub const CONTROL_PERIOD_MS: u64 = 10;

/// Walls farther than this are invisible to the proximity sensors
const SENSOR_RANGE: i32 = 600;
/// Proximity = gain / distance, so 400 ticks away reads 300
const PROXIMITY_GAIN: i32 = 120_000;
const PROXIMITY_MAX: i32 = 4095;
const SIDE_WALL: i32 = 400;
const DIAGONAL_WALL: i32 = 300;
/// Closest the chassis gets to a wall it drives into
const WALL_STANDOFF: i32 = 10;

/// Wheel speed units per encoder tick per control period
const SPEED_PER_TICK: i16 = 6;
const TURN_MS_PER_DEGREE: u64 = 4;

const LINE_DARK: i32 = 100;
const FLOOR: i32 = 600;
const LIGHT_NEST: i32 = 500;
const LIGHT_ROOM: i32 = 900;

/// Wall layout of a 4x4 maze plus the location of the dark nest cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimMaze {
    /// open[x][y][heading]
    open: [[[bool; 4]; 4]; 4],
    nest: GridPosition,
}

impl SimMaze {
    /// Every cell boxed in by four walls
    pub fn closed(nest: GridPosition) -> Self {
        Self {
            open: [[[false; 4]; 4]; 4],
            nest,
        }
    }

    /// Knock out the wall between `cell` and its neighbour towards `heading`.
    /// The outer boundary cannot be opened.
    pub fn open_passage(&mut self, cell: GridPosition, heading: Orientation) -> &mut Self {
        if let Some(next) = cell.neighbor(heading) {
            self.open[cell.x as usize][cell.y as usize][heading.index()] = true;
            self.open[next.x as usize][next.y as usize][heading.opposite().index()] = true;
        }
        self
    }

    pub fn is_open(&self, cell: GridPosition, heading: Orientation) -> bool {
        self.open[cell.x as usize][cell.y as usize][heading.index()]
    }

    pub fn nest(&self) -> GridPosition {
        self.nest
    }

    /// A perfect maze (every cell reachable, no loops) entered at (1, 0)
    /// facing north, with the nest in the dead end at (2, 2).
    ///
    /// ```text
    ///  +---+---+---+---+
    ///  |       |       |
    ///  +   +   +---+   +
    ///  |   |   | N     |
    ///  +   +   +---+   +
    ///  |   |       |   |
    ///  +   +   +   +   +
    ///  |   | S |       |
    ///  +---+---+---+---+
    /// ```
    pub fn reference() -> Self {
        use Orientation::{East, North, South, West};
        let mut maze = Self::closed(GridPosition::new(2, 2));
        let cell = GridPosition::new;
        maze.open_passage(cell(1, 0), North)
            .open_passage(cell(1, 1), North)
            .open_passage(cell(1, 2), North)
            .open_passage(cell(1, 3), West)
            .open_passage(cell(0, 3), South)
            .open_passage(cell(0, 2), South)
            .open_passage(cell(0, 1), South)
            .open_passage(cell(1, 1), East)
            .open_passage(cell(2, 1), South)
            .open_passage(cell(2, 0), East)
            .open_passage(cell(3, 0), North)
            .open_passage(cell(3, 1), North)
            .open_passage(cell(3, 2), West)
            .open_passage(cell(3, 2), North)
            .open_passage(cell(3, 3), West);
        maze
    }
}

/// Simulated robot inside a `SimMaze`
#[derive(Debug, Clone)]
pub struct MazeSimulator {
    maze: SimMaze,
    cell: GridPosition,
    heading: Orientation,
    progress: i32,
    motors: MotorCommand,
    encoders: [i32; 2],
    clock_ms: u64,
    collisions: u32,
}

impl MazeSimulator {
    /// Place the robot at the centre of `cell`
    pub fn new(maze: SimMaze, cell: GridPosition, heading: Orientation) -> Self {
        Self {
            maze,
            cell,
            heading,
            progress: CELL_TICKS / 2,
            motors: MotorCommand::stop(),
            encoders: [0; 2],
            clock_ms: 0,
            collisions: 0,
        }
    }

    pub fn maze(&self) -> &SimMaze {
        &self.maze
    }

    /// The cell the robot is physically in
    pub fn cell(&self) -> GridPosition {
        self.cell
    }

    pub fn heading(&self) -> Orientation {
        self.heading
    }

    pub fn progress(&self) -> i32 {
        self.progress
    }

    pub fn motors(&self) -> MotorCommand {
        self.motors
    }

    /// How many control periods ended with the chassis pressed against a wall
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    fn on_line(&self) -> bool {
        (self.progress >= CELL_TICKS - LINE_HALF_WIDTH && self.maze.is_open(self.cell, self.heading))
            || (self.progress < LINE_HALF_WIDTH
                && self.maze.is_open(self.cell, self.heading.opposite()))
    }

    /// Integrate one control period of the current motor command
    fn step(&mut self) {
        self.clock_ms += CONTROL_PERIOD_MS;

        let [left, right] = self.motors.as_array().map(|speed| speed / SPEED_PER_TICK);
        self.encoders[0] += left as i32;
        self.encoders[1] += right as i32;
        self.progress += ((left + right) / 2) as i32;

        loop {
            if self.progress >= CELL_TICKS {
                match self.passable(self.heading) {
                    Some(next) => {
                        self.cell = next;
                        self.progress -= CELL_TICKS;
                    }
                    None => break,
                }
            } else if self.progress < 0 {
                match self.passable(self.heading.opposite()) {
                    Some(prev) => {
                        self.cell = prev;
                        self.progress += CELL_TICKS;
                    }
                    None => break,
                }
            } else {
                break;
            }
        }

        if !self.maze.is_open(self.cell, self.heading)
            && self.progress > CELL_TICKS - WALL_STANDOFF
        {
            self.progress = CELL_TICKS - WALL_STANDOFF;
            self.collisions += 1;
        }
        if !self.maze.is_open(self.cell, self.heading.opposite()) && self.progress < WALL_STANDOFF
        {
            self.progress = WALL_STANDOFF;
            self.collisions += 1;
        }
    }

    fn passable(&self, heading: Orientation) -> Option<GridPosition> {
        if self.maze.is_open(self.cell, heading) {
            self.cell.neighbor(heading)
        } else {
            None
        }
    }

    /// Proximity to the nearest wall along `heading`, starting `distance`
    /// ticks away at the current cell's boundary
    fn proximity_along(&self, heading: Orientation, mut distance: i32) -> i32 {
        let mut cell = self.cell;
        while distance <= SENSOR_RANGE && self.maze.is_open(cell, heading) {
            match cell.neighbor(heading) {
                Some(next) => cell = next,
                None => break,
            }
            distance += CELL_TICKS;
        }
        if distance > SENSOR_RANGE {
            0
        } else {
            (PROXIMITY_GAIN / distance.max(1)).min(PROXIMITY_MAX)
        }
    }

    fn side_wall(&self, heading: Orientation, reading: i32) -> i32 {
        if self.maze.is_open(self.cell, heading) {
            0
        } else {
            reading
        }
    }
}

impl Hardware for MazeSimulator {
    fn set_motors(&mut self, command: MotorCommand) -> Result<()> {
        self.motors = command;
        self.step();
        Ok(())
    }

    fn turn(&mut self, turn: Turn) -> Result<()> {
        self.clock_ms += turn.degrees as u64 * TURN_MS_PER_DEGREE;
        let quarters = ((turn.degrees as usize + 45) / 90) % 4;
        if quarters == 0 {
            return Ok(());
        }
        self.heading = match turn.direction {
            TurnDirection::Right => self.heading.rotated(quarters),
            TurnDirection::Left => self.heading.rotated(4 - quarters),
        };
        self.progress = CELL_TICKS / 2;
        Ok(())
    }

    fn drive_forward(&mut self, millis: u32) -> Result<()> {
        self.clock_ms += millis as u64;
        Ok(())
    }

    fn drive_backward(&mut self, millis: u32) -> Result<()> {
        self.clock_ms += millis as u64;
        Ok(())
    }

    fn read_proximity(&mut self, sensor: ProximitySensor) -> Result<i32> {
        let heading = self.heading;
        Ok(match sensor {
            ProximitySensor::Front => self.proximity_along(heading, CELL_TICKS - self.progress),
            ProximitySensor::Rear => self.proximity_along(heading.opposite(), self.progress),
            ProximitySensor::Left => self.side_wall(heading.counter_clockwise(), SIDE_WALL),
            ProximitySensor::Right => self.side_wall(heading.clockwise(), SIDE_WALL),
            ProximitySensor::FrontLeft => {
                self.side_wall(heading.counter_clockwise(), DIAGONAL_WALL)
            }
            ProximitySensor::FrontRight => self.side_wall(heading.clockwise(), DIAGONAL_WALL),
        })
    }

    fn read_line(&mut self, _sensor: LineSensor) -> Result<i32> {
        Ok(if self.on_line() { LINE_DARK } else { FLOOR })
    }

    fn read_encoder(&mut self, channel: EncoderChannel) -> Result<i32> {
        Ok(match channel {
            EncoderChannel::Left => self.encoders[0],
            EncoderChannel::Right => self.encoders[1],
        })
    }

    fn reset_encoders(&mut self) -> Result<()> {
        self.encoders = [0; 2];
        Ok(())
    }

    fn read_ambient_light(&mut self) -> Result<i32> {
        // The nest beacon is only visible from inside the cell, past the lines
        Ok(if self.cell == self.maze.nest() && !self.on_line() {
            LIGHT_NEST
        } else {
            LIGHT_ROOM
        })
    }

    fn now_millis(&mut self) -> u64 {
        self.clock_ms
    }

    fn delay_millis(&mut self, millis: u32) -> Result<()> {
        self.clock_ms += millis as u64;
        Ok(())
    }
}
