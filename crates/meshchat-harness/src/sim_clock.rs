//! Virtual wall clock.

use meshchat_core::Timestamp;

/// Default start time: 2024-01-01T00:00:00Z.
pub const DEFAULT_EPOCH_MILLIS: u64 = 1_704_067_200_000;

/// Manually advanced clock. Every reading is reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    now: u64,
    step: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_EPOCH_MILLIS, 100)
    }
}

impl SimClock {
    /// Clock starting at `start_millis` that moves `step_millis` per tick.
    pub fn new(start_millis: u64, step_millis: u64) -> Self {
        Self { now: start_millis, step: step_millis }
    }

    /// Current time.
    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now)
    }

    /// Advance by one step and return the new time.
    pub fn tick(&mut self) -> Timestamp {
        self.advance(self.step)
    }

    /// Advance by `millis` and return the new time.
    pub fn advance(&mut self, millis: u64) -> Timestamp {
        self.now = self.now.saturating_add(millis);
        self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_by_step() {
        let mut clock = SimClock::new(1_000, 250);
        assert_eq!(clock.tick(), Timestamp::from_millis(1_250));
        assert_eq!(clock.advance(50), Timestamp::from_millis(1_300));
        assert_eq!(clock.now(), Timestamp::from_millis(1_300));
    }
}
