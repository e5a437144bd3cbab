use std::time::Duration;

use tokio::time::Instant;

use super::deadline_after;

/// Delay after the first failed publish.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Exponential backoff gate in front of the publish step.
///
/// After a failure the next attempt waits for the current delay, which then
/// doubles up to the cap. A success resets the delay and makes the next
/// attempt immediately eligible.
#[derive(Debug, Clone)]
pub struct PublishBackoff {
    delay: Duration,
    max: Duration,
    next_attempt_at: Option<Instant>,
}

impl PublishBackoff {
    /// Creates a gate whose delay never exceeds `max` (at least [`INITIAL_BACKOFF`]).
    pub fn new(max: Duration) -> Self {
        Self {
            delay: INITIAL_BACKOFF,
            max: max.max(INITIAL_BACKOFF),
            next_attempt_at: None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_attempt_at.is_none_or(|at| now >= at)
    }

    pub fn on_success(&mut self) {
        self.delay = INITIAL_BACKOFF;
        self.next_attempt_at = None;
    }

    /// Schedules the next attempt and returns the delay it was given.
    pub fn on_failure(&mut self, now: Instant) -> Duration {
        let delay = self.delay;
        self.next_attempt_at = Some(deadline_after(now, delay));
        self.delay = self.delay.saturating_mul(2).min(self.max);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_up_to_cap() {
        let now = Instant::now();
        let mut backoff = PublishBackoff::new(Duration::from_secs(8));

        let delays: Vec<u64> = (0..5).map(|_| backoff.on_failure(now).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8]);
    }

    #[test]
    fn test_failure_gates_next_attempt() {
        let now = Instant::now();
        let mut backoff = PublishBackoff::new(Duration::from_secs(60));
        assert!(backoff.is_due(now));

        backoff.on_failure(now);
        backoff.on_failure(now);
        assert!(!backoff.is_due(now + Duration::from_millis(1999)));
        assert!(backoff.is_due(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_success_resets() {
        let now = Instant::now();
        let mut backoff = PublishBackoff::new(Duration::from_secs(60));
        backoff.on_failure(now);
        backoff.on_failure(now);
        backoff.on_success();

        assert!(backoff.is_due(now));
        assert_eq!(backoff.on_failure(now), INITIAL_BACKOFF);
    }

    #[test]
    fn test_huge_cap_saturates() {
        let now = Instant::now();
        let mut backoff = PublishBackoff::new(Duration::MAX);
        for _ in 0..80 {
            backoff.on_failure(now);
        }

        assert_eq!(backoff.on_failure(now), Duration::MAX);
        assert!(!backoff.is_due(now + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn test_cap_is_at_least_initial_delay() {
        let now = Instant::now();
        let mut backoff = PublishBackoff::new(Duration::ZERO);
        assert_eq!(backoff.on_failure(now), INITIAL_BACKOFF);
        assert_eq!(backoff.on_failure(now), INITIAL_BACKOFF);
    }
}
