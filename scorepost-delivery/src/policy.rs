//! Retry policy for failed batches.
//!
//! Retries are paced at a fixed interval and bounded by an attempt ceiling.
//! An envelope records one attempt for its initial failure and one more for
//! every failed retry; once the count passes the ceiling the envelope is
//! escalated instead of requeued.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    pacing_interval: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, pacing_interval: Duration) -> Self {
        Self {
            max_attempts,
            pacing_interval,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before draining a fresh batch and before each retry.
    #[must_use]
    pub const fn pacing_interval(&self) -> Duration {
        self.pacing_interval
    }

    /// Whether an envelope whose attempt count was just incremented to
    /// `attempts` has exhausted its budget.
    #[must_use]
    pub const fn should_escalate(&self, attempts: u32) -> bool {
        attempts > self.max_attempts
    }

    /// Retries left before escalation for an envelope at `attempts`.
    #[must_use]
    pub const fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_add(1).saturating_sub(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_escalate() {
        let policy = RetryPolicy::new(3, Duration::ZERO);

        assert!(!policy.should_escalate(1));
        assert!(!policy.should_escalate(2));
        assert!(!policy.should_escalate(3));
        assert!(policy.should_escalate(4));
        assert!(policy.should_escalate(10));
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy::new(1, Duration::ZERO);

        // The first failure is attempt 1; the first failed retry escalates
        assert!(!policy.should_escalate(1));
        assert!(policy.should_escalate(2));
    }

    #[test]
    fn test_remaining_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(5));

        assert_eq!(policy.remaining_attempts(1), 3);
        assert_eq!(policy.remaining_attempts(3), 1);
        assert_eq!(policy.remaining_attempts(4), 0);
        assert_eq!(policy.remaining_attempts(20), 0);
        assert_eq!(policy.pacing_interval(), Duration::from_millis(5));
    }
}
