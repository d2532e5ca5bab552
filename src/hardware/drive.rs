// Differential drive commands for the two-wheel base
// Wheel speeds are signed percentages of full motor power.

/// Maximum magnitude of a wheel speed command (safety limit)
pub const MAX_SPEED: i16 = 100;

/// Speed commands for the left and right wheels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorCommand {
    pub left: i16,
    pub right: i16,
}

impl MotorCommand {
    /// Build a command, clamping each wheel to `[-MAX_SPEED, MAX_SPEED]`
    pub fn new(left: i16, right: i16) -> Self {
        Self {
            left: clamp_speed(left),
            right: clamp_speed(right),
        }
    }

    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Returns speeds as array [left, right]
    pub fn as_array(&self) -> [i16; 2] {
        [self.left, self.right]
    }
}

fn clamp_speed(speed: i16) -> i16 {
    speed.clamp(-MAX_SPEED, MAX_SPEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_zero() {
        let cmd = MotorCommand::stop();
        assert!(cmd.is_stopped());
        assert_eq!(cmd.as_array(), [0, 0]);
    }

    #[test]
    fn test_speeds_clamped() {
        let cmd = MotorCommand::new(250, -400);
        assert_eq!(cmd.left, MAX_SPEED, "Left wheel not clamped");
        assert_eq!(cmd.right, -MAX_SPEED, "Right wheel not clamped");
    }

    #[test]
    fn test_in_range_untouched() {
        let cmd = MotorCommand::new(-20, 99);
        assert_eq!(cmd.as_array(), [-20, 99]);
    }
}
