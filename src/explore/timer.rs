// Deferred left-turn timer
//
// Armed when the robot leaves a floor line, cleared by a left turn or by
// the next line. The encoder travel half of the gate lives in the
// wall follower, which sees the snapshot.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnTimer {
    deadline_ms: Option<u64>,
}

impl TurnTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the pending turn `delay_ms` after `now_ms`
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn clear(&mut self) {
        self.deadline_ms = None;
    }

    /// A turn is pending, whether or not its delay has passed
    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn has_elapsed(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_never_elapses() {
        let timer = TurnTimer::new();
        assert!(!timer.is_armed());
        assert!(!timer.has_elapsed(u64::MAX));
    }

    #[test]
    fn test_elapses_at_deadline() {
        let mut timer = TurnTimer::new();
        timer.arm(1_000, 285);
        assert!(timer.is_armed());
        assert!(!timer.has_elapsed(1_284));
        assert!(timer.has_elapsed(1_285));
        assert_eq!(timer.deadline_ms(), Some(1_285));
    }

    #[test]
    fn test_clear_disarms() {
        let mut timer = TurnTimer::new();
        timer.arm(0, 10);
        timer.clear();
        assert!(!timer.is_armed());
        assert!(!timer.has_elapsed(50));
    }

    #[test]
    fn test_armed_at_time_zero_is_still_armed() {
        // A deadline of 0 must not read as "no turn pending"
        let mut timer = TurnTimer::new();
        timer.arm(0, 0);
        assert!(timer.is_armed());
        assert!(timer.has_elapsed(0));
    }
}
