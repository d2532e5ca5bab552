// Timeouts, topics, serial port and controller thresholds
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::explore::pose::Orientation;

// Telemetry publish frequency
pub const PUBLISH_HZ: u64 = 20;

// Watchdog: status older than this marks the controller as stalled
pub const STATUS_TIMEOUT: Duration = Duration::from_millis(2000);

// Zenoh topics
pub const TOPIC_STATUS: &str = "maze/state/status"; // pose, phase, progress
pub const TOPIC_MAP: &str = "maze/state/map"; // recorded cells
pub const TOPIC_HEALTH: &str = "maze/state/health"; // watchdog status

// Serial port for the robot's motion board
pub const ROBOT_PORT: &str = "/dev/ttyUSB0";

/// Tunable thresholds for the exploration controller.
///
/// Proximity readings grow as an obstruction gets closer, line and light
/// readings shrink as the floor gets darker. Every field has a default so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Left wheel speed while cruising
    pub cruise_left: i16,
    /// Right wheel speed while cruising (lower, so the robot hugs the left wall)
    pub cruise_right: i16,

    pub left_turn_degrees: u16,
    pub right_turn_degrees: u16,
    /// Nudge used by the straightening corrector
    pub correction_degrees: u16,

    /// Left proximity below this is a gap worth turning into
    pub left_gap_below: u16,
    /// Left proximity above this is a wall we can turn right against
    pub left_wall_above: u16,
    /// Front proximity above this blocks forward travel
    pub front_blocked_above: u16,
    /// Side or diagonal proximity above this means we are drifting into a wall
    pub drift_above: u16,
    /// Front must read below this before straightening
    pub front_clear_below: u16,
    /// Proximity above this records a wall in the map
    pub wall_above: u16,

    /// Both line sensors below this: on a line
    pub line_on_below: u16,
    /// Both line sensors above this: back on clear floor
    pub line_off_above: u16,

    /// Wait after leaving a line before a deferred left turn may fire
    pub left_turn_delay_ms: u64,
    /// Left encoder travel required before a deferred left turn may fire
    pub min_travel_ticks: u32,

    /// Ambient light below this while exploring latches the nest
    pub nest_dark_below: u16,
    /// Ambient light at or below this ends the search for the nest
    pub nest_seek_at_or_below: u16,
    /// Front proximity at or above this stops the drive into the nest
    pub nest_stop_at_or_above: u16,

    pub start_x: u8,
    pub start_y: u8,
    pub start_orientation: Orientation,

    /// Give up after this many control cycles (unbounded when unset)
    pub max_cycles: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cruise_left: 42,
            cruise_right: 30,
            left_turn_degrees: 91,
            right_turn_degrees: 88,
            correction_degrees: 3,
            left_gap_below: 5,
            left_wall_above: 10,
            front_blocked_above: 300,
            drift_above: 1000,
            front_clear_below: 200,
            wall_above: 200,
            line_on_below: 200,
            line_off_above: 400,
            left_turn_delay_ms: 285,
            min_travel_ticks: 200,
            nest_dark_below: 700,
            nest_seek_at_or_below: 600,
            nest_stop_at_or_above: 300,
            start_x: 1,
            start_y: 0,
            start_orientation: Orientation::North,
            max_cycles: None,
        }
    }
}

impl ControllerConfig {
    /// Load a JSON config file, filling unnamed fields with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject threshold combinations the controller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.line_on_below >= self.line_off_above {
            return Err(Error::InvalidConfig(format!(
                "line_on_below ({}) must be below line_off_above ({})",
                self.line_on_below, self.line_off_above
            )));
        }
        if self.left_gap_below > self.left_wall_above {
            return Err(Error::InvalidConfig(format!(
                "left_gap_below ({}) must not exceed left_wall_above ({})",
                self.left_gap_below, self.left_wall_above
            )));
        }
        if self.nest_seek_at_or_below >= self.nest_dark_below {
            return Err(Error::InvalidConfig(format!(
                "nest_seek_at_or_below ({}) must be below nest_dark_below ({})",
                self.nest_seek_at_or_below, self.nest_dark_below
            )));
        }
        if self.start_x > 3 || self.start_y > 3 {
            return Err(Error::InvalidConfig(format!(
                "start cell ({}, {}) is outside the 4x4 maze",
                self.start_x, self.start_y
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{ "left_turn_delay_ms": 400, "start_orientation": "east" }"#)
                .unwrap();
        assert_eq!(config.left_turn_delay_ms, 400);
        assert_eq!(config.start_orientation, Orientation::East);
        assert_eq!(config.line_on_below, 200);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn test_inverted_line_band_rejected() {
        let config = ControllerConfig {
            line_on_below: 500,
            line_off_above: 400,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_start_outside_maze_rejected() {
        let config = ControllerConfig {
            start_x: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
