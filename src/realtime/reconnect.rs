/// Reconnection policy - capped exponential backoff
///
/// State machine {Stable, Retrying, Exhausted}. An unclean close moves the
/// policy to Retrying; each retry is scheduled after base * 2^(attempt-1)
/// capped at the configured maximum. A successful open resets the attempt
/// counter. Past the ceiling the policy is Exhausted and stays there until
/// the caller explicitly re-acquires the connection.
///
/// Not a circuit breaker: there is no half-open probing, reconnection is
/// always caller-initiated once exhausted.
use std::time::Duration;

/// Policy phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    Stable,
    Retrying,
    Exhausted,
}

/// Backoff scheduler attached to one connection
#[derive(Debug)]
pub struct ReconnectPolicy {
    phase: ReconnectPhase,
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            phase: ReconnectPhase::Stable,
            attempt: 0,
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    /// Attempts made since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Ceiling on automatic retries
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record a successful open: back to Stable, counter reset
    pub fn record_open(&mut self) {
        self.phase = ReconnectPhase::Stable;
        self.attempt = 0;
    }

    /// Schedule the next retry after an unclean close
    ///
    /// Returns the delay to sleep before reconnecting, or None once the
    /// ceiling is exceeded (phase becomes Exhausted, no automatic retries).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            self.phase = ReconnectPhase::Exhausted;
            return None;
        }

        self.attempt += 1;
        self.phase = ReconnectPhase::Retrying;

        let exp = self.attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut p = ReconnectPolicy::new(Duration::from_secs(4), Duration::from_secs(30), 10);

        assert_eq!(p.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(p.next_delay(), Some(Duration::from_secs(8)));
        assert_eq!(p.next_delay(), Some(Duration::from_secs(16)));
        // 32s would exceed the cap
        assert_eq!(p.next_delay(), Some(Duration::from_secs(30)));
        assert_eq!(p.phase(), ReconnectPhase::Retrying);
    }

    #[test]
    fn test_ceiling_exhausts_policy() {
        let mut p = policy();

        for _ in 0..5 {
            assert!(p.next_delay().is_some());
        }
        // sixth close is not retried
        assert_eq!(p.next_delay(), None);
        assert_eq!(p.phase(), ReconnectPhase::Exhausted);

        // still exhausted on further closes
        assert_eq!(p.next_delay(), None);
    }

    #[test]
    fn test_open_resets_counter() {
        let mut p = policy();

        assert_eq!(p.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(p.next_delay(), Some(Duration::from_secs(2)));

        p.record_open();
        assert_eq!(p.phase(), ReconnectPhase::Stable);
        assert_eq!(p.attempts(), 0);
        assert_eq!(p.next_delay(), Some(Duration::from_secs(1)));
    }
}
