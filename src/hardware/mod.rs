// Hardware abstraction for the maze robot
//
// Provides:
// - The `Hardware` capability trait consumed by the exploration controller
// - Differential drive commands
// - A serial driver for the robot's motion board
// - A deterministic maze simulator for tests and dry runs

mod drive;
pub mod protocol;
mod serial;
pub mod sim;

pub use drive::{MotorCommand, MAX_SPEED};
pub use protocol::{MotionBus, DEFAULT_BAUDRATE};
pub use serial::SerialRobot;
pub use sim::{MazeSimulator, SimMaze};

/// Proximity sensors around the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximitySensor {
    Front,
    Rear,
    Left,
    Right,
    FrontLeft,
    FrontRight,
}

impl ProximitySensor {
    pub const ALL: [ProximitySensor; 6] = [
        ProximitySensor::Front,
        ProximitySensor::Rear,
        ProximitySensor::Left,
        ProximitySensor::Right,
        ProximitySensor::FrontLeft,
        ProximitySensor::FrontRight,
    ];
}

/// Floor line sensors, left and right of the chassis centre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSensor {
    Left = 0,
    Right = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderChannel {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

/// A blocking in-place turn request. Returning from `Hardware::turn`
/// means the turn ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub direction: TurnDirection,
    pub degrees: u16,
}

impl Turn {
    pub const fn left(degrees: u16) -> Self {
        Self {
            direction: TurnDirection::Left,
            degrees,
        }
    }

    pub const fn right(degrees: u16) -> Self {
        Self {
            direction: TurnDirection::Right,
            degrees,
        }
    }
}

/// Error types for talking to the robot
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from board {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("Checksum mismatch for board {id}")]
    ChecksumMismatch { id: u8 },

    #[error("Board {id} returned error status: 0x{status:02X}")]
    DeviceError { id: u8, status: u8 },

    #[error("Timeout waiting for response from board {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Everything the exploration controller needs from the robot.
///
/// Proximity readings are unitless and grow as an obstruction gets closer.
/// Line and light readings shrink as the surface gets darker.
pub trait Hardware {
    /// Continuous differential drive; holds until the next command
    fn set_motors(&mut self, command: MotorCommand) -> Result<()>;

    /// Blocking in-place turn
    fn turn(&mut self, turn: Turn) -> Result<()>;

    /// Blocking timed move forward
    fn drive_forward(&mut self, millis: u32) -> Result<()>;

    /// Blocking timed move backward
    fn drive_backward(&mut self, millis: u32) -> Result<()>;

    fn read_proximity(&mut self, sensor: ProximitySensor) -> Result<i32>;

    fn read_line(&mut self, sensor: LineSensor) -> Result<i32>;

    /// Cumulative ticks since the last `reset_encoders`
    fn read_encoder(&mut self, channel: EncoderChannel) -> Result<i32>;

    fn reset_encoders(&mut self) -> Result<()>;

    fn read_ambient_light(&mut self) -> Result<i32>;

    /// Monotonic clock in milliseconds
    fn now_millis(&mut self) -> u64;

    /// Blocking sleep
    fn delay_millis(&mut self, millis: u32) -> Result<()>;

    fn stop(&mut self) -> Result<()> {
        self.set_motors(MotorCommand::stop())
    }
}
