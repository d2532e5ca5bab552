// Left-hand wall following and straightening
//
// Both behaviours are pure: they look at one snapshot plus the turn timer
// and say what to do. The controller carries the decision out and only
// updates the pose once a turn has completed.

use super::sensors::SensorSnapshot;
use super::timer::TurnTimer;
use crate::config::ControllerConfig;
use crate::hardware::{MotorCommand, Turn};

/// Turn decided by the wall follower for this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerTurn {
    /// Deferred left turn into a gap in the left wall
    GapLeft,
    /// Front and left blocked: turn right along the wall
    WallRight,
    /// Front blocked while a left turn is pending and the gap is closing
    EmergencyLeft,
}

impl FollowerTurn {
    pub fn request(self, config: &ControllerConfig) -> Turn {
        match self {
            FollowerTurn::GapLeft | FollowerTurn::EmergencyLeft => {
                Turn::left(config.left_turn_degrees)
            }
            FollowerTurn::WallRight => Turn::right(config.right_turn_degrees),
        }
    }
}

/// Forward drive biased towards the left wall
pub fn cruise(config: &ControllerConfig) -> MotorCommand {
    MotorCommand::new(config.cruise_left, config.cruise_right)
}

/// Decide whether this cycle turns. A clear left side only ever leads to
/// the deferred left turn; the front wall is handled when the left is not
/// clear.
pub fn wall_follow(
    snapshot: &SensorSnapshot,
    timer: &TurnTimer,
    config: &ControllerConfig,
) -> Option<FollowerTurn> {
    let proximity = &snapshot.proximity;

    if proximity.left < config.left_gap_below {
        let ready = timer.has_elapsed(snapshot.now_ms)
            && snapshot.left_travel > config.min_travel_ticks;
        return ready.then_some(FollowerTurn::GapLeft);
    }

    if proximity.front > config.front_blocked_above {
        if proximity.left > config.left_wall_above {
            return Some(FollowerTurn::WallRight);
        }
        if timer.is_armed() {
            return Some(FollowerTurn::EmergencyLeft);
        }
    }

    None
}

/// Small nudge away from a wall the robot is drifting into. Suppressed
/// while crossing a line and when the front is not clear.
pub fn straighten(
    snapshot: &SensorSnapshot,
    on_line: bool,
    config: &ControllerConfig,
) -> Option<Turn> {
    let proximity = &snapshot.proximity;
    if on_line || proximity.front >= config.front_clear_below {
        return None;
    }

    let right_close =
        proximity.right > config.drift_above || proximity.front_right > config.drift_above;
    let left_close =
        proximity.left > config.drift_above || proximity.front_left > config.drift_above;

    match (left_close, right_close) {
        (false, true) => Some(Turn::left(config.correction_degrees)),
        (true, false) => Some(Turn::right(config.correction_degrees)),
        // Squeezed on both sides or centred: nothing to correct
        _ => None,
    }
}
