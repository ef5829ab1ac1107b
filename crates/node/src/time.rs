use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use auto_impl::auto_impl;

/// Trait for timers that report the number of seconds since the UNIX epoch.
#[auto_impl(Box, Arc)]
pub trait TimeSinceEpoch: Debug + Send + Sync {
    /// Returns the number of seconds since the UNIX epoch.
    fn since_epoch(&self) -> u64;
}

/// A timer that uses the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentTime;

impl TimeSinceEpoch for CurrentTime {
    fn since_epoch(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

/// A timer that only moves when told to. Useful for deterministic tests.
#[derive(Debug)]
pub struct MockTime {
    seconds: AtomicU64,
}

impl MockTime {
    /// Constructs an instance that starts at the current system time.
    pub fn now() -> Self {
        Self::with_seconds(CurrentTime.since_epoch())
    }

    /// Constructs an instance that starts at the provided number of seconds
    /// since the epoch.
    pub fn with_seconds(seconds: u64) -> Self {
        Self {
            seconds: AtomicU64::new(seconds),
        }
    }

    /// Moves the timer forward.
    pub fn add_seconds(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::Relaxed);
    }
}

impl TimeSinceEpoch for MockTime {
    fn since_epoch(&self) -> u64 {
        self.seconds.load(Ordering::Relaxed)
    }
}

/// A shared mock timer.
pub type SharedMockTime = Arc<MockTime>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_time_moves_on_request() {
        let time = MockTime::with_seconds(100);
        assert_eq!(time.since_epoch(), 100);

        time.add_seconds(5);
        assert_eq!(time.since_epoch(), 105);
    }
}
