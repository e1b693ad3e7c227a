//! Request sequencing for last-writer-wins application of responses.

use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to a resolved oracle response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// The response became the current prediction.
    Applied,
    /// A newer request had been issued; the response was dropped.
    StaleResponseDiscarded,
}

impl ApplyOutcome {
    /// Returns true if the response was applied.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Monotonic request counter.
///
/// Every oracle call takes a number from [`RequestSequence::issue`]. A
/// response may only be applied while its number is still the highest
/// issued.
#[derive(Debug, Default)]
pub struct RequestSequence {
    issued: AtomicU64,
    discarded: AtomicU64,
}

impl RequestSequence {
    /// Creates a counter with nothing issued.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Issues the next sequence number (starting at 1).
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Highest number issued so far (0 if none).
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    /// Decides whether the response for `sequence` may be applied.
    ///
    /// Counts the discards for diagnostics.
    pub fn admit(&self, sequence: u64) -> ApplyOutcome {
        if sequence == self.latest() {
            ApplyOutcome::Applied
        } else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            ApplyOutcome::StaleResponseDiscarded
        }
    }

    /// Responses discarded as stale so far.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_is_admitted() {
        let seq = RequestSequence::new();
        assert_eq!(seq.latest(), 0);
        let first = seq.issue();
        let second = seq.issue();
        assert_eq!((first, second), (1, 2));

        assert_eq!(seq.admit(second), ApplyOutcome::Applied);
        assert_eq!(seq.admit(first), ApplyOutcome::StaleResponseDiscarded);
        assert_eq!(seq.discarded(), 1);
        assert!(!ApplyOutcome::StaleResponseDiscarded.is_applied());
    }
}
