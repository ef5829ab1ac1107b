use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// A counter of state versions that is shared between copies of a state
/// manager, so that every version it hands out is unique across all copies.
///
/// Two states with the same version are guaranteed to have the same value.
#[derive(Clone, Debug, Default)]
pub struct VersionCounter(Arc<AtomicU64>);

impl VersionCounter {
    /// Returns a new, previously unused version.
    pub fn next_version(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_between_clones() {
        let counter = VersionCounter::default();
        let other = counter.clone();

        let first = counter.next_version();
        let second = other.next_version();
        let third = counter.next_version();

        assert!(first < second);
        assert!(second < third);
    }
}
