use std::time::Duration;

/// Per-run counters accumulated by the round loop.
#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub compute_time: Duration,
    pub comm_time: Duration,

    /// Rounds completed.
    pub rounds: u64,
    /// Rounds where a received gradient was applied.
    pub updates: u64,
    /// Rounds degraded by a communication failure or an absent predecessor.
    pub degraded: u64,
}

impl WorkerMetrics {
    #[inline]
    pub fn bump_round(&mut self) {
        self.rounds += 1;
    }

    #[inline]
    pub fn bump_update(&mut self) {
        self.updates += 1;
    }

    #[inline]
    pub fn bump_degraded(&mut self) {
        self.degraded += 1;
    }
}
