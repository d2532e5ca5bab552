// Floor line crossing detection with a hysteresis band
//
// Entering a line needs both sensors darker than `line_on_below`; leaving it
// needs both brighter than `line_off_above`. Readings inside the band never
// change state, so noise around one threshold cannot count a line twice.

use serde::{Deserialize, Serialize};

use super::sensors::SensorSnapshot;
use super::timer::TurnTimer;
use crate::config::ControllerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    #[default]
    NotOnLine,
    OnLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Both sensors just went dark
    Entered,
    /// Back on clear floor on the far side: the robot is in the next cell
    Crossed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCrossingDetector {
    state: LineState,
}

impl LineCrossingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn is_on_line(&self) -> bool {
        self.state == LineState::OnLine
    }

    /// Feed one snapshot. Entering a line cancels any pending left turn;
    /// completing a crossing arms a new one.
    pub fn update(
        &mut self,
        snapshot: &SensorSnapshot,
        timer: &mut TurnTimer,
        config: &ControllerConfig,
    ) -> Option<LineEvent> {
        let [left, right] = snapshot.line;
        match self.state {
            LineState::NotOnLine
                if left < config.line_on_below && right < config.line_on_below =>
            {
                self.state = LineState::OnLine;
                timer.clear();
                Some(LineEvent::Entered)
            }
            LineState::OnLine
                if left > config.line_off_above
                    && right > config.line_off_above
                    && !timer.is_armed() =>
            {
                self.state = LineState::NotOnLine;
                timer.arm(snapshot.now_ms, config.left_turn_delay_ms);
                Some(LineEvent::Crossed)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(left: u16, right: u16, now_ms: u64) -> SensorSnapshot {
        SensorSnapshot {
            line: [left, right],
            now_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_crossing() {
        let config = ControllerConfig::default();
        let mut detector = LineCrossingDetector::new();
        let mut timer = TurnTimer::new();
        timer.arm(0, 100);

        assert_eq!(detector.update(&floor(600, 600, 10), &mut timer, &config), None);
        assert_eq!(
            detector.update(&floor(120, 150, 20), &mut timer, &config),
            Some(LineEvent::Entered)
        );
        assert!(!timer.is_armed(), "entering a line must cancel the pending turn");

        assert_eq!(
            detector.update(&floor(500, 450, 30), &mut timer, &config),
            Some(LineEvent::Crossed)
        );
        assert_eq!(detector.state(), LineState::NotOnLine);
        assert_eq!(timer.deadline_ms(), Some(30 + config.left_turn_delay_ms));
    }

    #[test]
    fn test_one_sensor_is_not_enough() {
        let config = ControllerConfig::default();
        let mut detector = LineCrossingDetector::new();
        let mut timer = TurnTimer::new();

        assert_eq!(detector.update(&floor(100, 600, 0), &mut timer, &config), None);
        assert!(!detector.is_on_line());

        detector.update(&floor(100, 100, 10), &mut timer, &config);
        assert_eq!(detector.update(&floor(600, 300, 20), &mut timer, &config), None);
        assert!(detector.is_on_line());
    }

    #[test]
    fn test_noise_inside_band_counts_once() {
        let config = ControllerConfig::default();
        let mut detector = LineCrossingDetector::new();
        let mut timer = TurnTimer::new();

        detector.update(&floor(100, 100, 0), &mut timer, &config);

        // Readings chatter around the exit threshold, then drift back into
        // the band without ever getting dark enough to re-enter
        let noisy = [199, 250, 380, 399, 401, 399, 401, 350, 402, 205, 398];
        let mut crossings = 0;
        for (i, &v) in noisy.iter().enumerate() {
            let event = detector.update(&floor(v, v, i as u64), &mut timer, &config);
            if event == Some(LineEvent::Crossed) {
                crossings += 1;
            }
        }
        assert_eq!(crossings, 1);
        assert!(!detector.is_on_line());
    }

    #[test]
    fn test_exit_waits_for_pending_turn() {
        let config = ControllerConfig::default();
        let mut detector = LineCrossingDetector::new();
        let mut timer = TurnTimer::new();

        detector.update(&floor(100, 100, 0), &mut timer, &config);
        timer.arm(0, 50);
        assert_eq!(detector.update(&floor(600, 600, 10), &mut timer, &config), None);
        assert!(detector.is_on_line());

        timer.clear();
        assert_eq!(
            detector.update(&floor(600, 600, 20), &mut timer, &config),
            Some(LineEvent::Crossed)
        );
    }
}
