use serde::{Deserialize, Serialize};

use crate::domain::LogicalTick;

/// Attempts made so far for one job. Only `record_attempt` moves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRetryState {
    pub attempt_count: u32,
    pub last_attempt_tick: LogicalTick,
}

impl JobRetryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_first_attempt(&self) -> bool {
        self.attempt_count == 0
    }

    pub fn next_attempt_number(&self) -> u32 {
        self.attempt_count.saturating_add(1)
    }

    pub fn record_attempt(&mut self, tick: LogicalTick) {
        self.attempt_count = self.next_attempt_number();
        self.last_attempt_tick = tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_attempt_advances_count_and_tick() {
        let mut state = JobRetryState::new();
        assert!(state.is_first_attempt());

        state.record_attempt(3);
        state.record_attempt(9);

        assert_eq!(state.attempt_count, 2);
        assert_eq!(state.last_attempt_tick, 9);
        assert_eq!(state.next_attempt_number(), 3);
    }
}
