use chrono::TimeDelta;
use tokio::time::Instant;

/// Monotonic mission time, measured from boot.
///
/// Backed by `tokio::time::Instant` so a paused test runtime controls it.
#[derive(Debug, Clone, Copy)]
pub struct MissionClock {
    boot: Instant,
}

impl MissionClock {
    pub fn start() -> Self { Self { boot: Instant::now() } }

    /// Time since boot.
    pub fn now(&self) -> TimeDelta {
        TimeDelta::from_std(self.boot.elapsed()).unwrap_or(TimeDelta::MAX)
    }
}
