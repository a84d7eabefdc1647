use rand::Rng;
use std::time::Duration;

/// Exponential backoff settings for delivering one batch.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total delivery attempts for one batch, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on the time a batch may spend sleeping between attempts.
    pub max_elapsed: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    /// before jitter is applied.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.base_delay.as_millis() as u64;
        let multiplier = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let base_delay = Duration::from_millis(base_millis.saturating_mul(multiplier));

        let capped_delay = std::cmp::min(base_delay, self.max_delay);

        if self.jitter {
            apply_jitter(capped_delay)
        } else {
            capped_delay
        }
    }

    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            failures: 0,
            waited: Duration::ZERO,
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    let jittered_millis = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_millis)
}

/// Retry schedule for a single batch.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    failures: u32,
    waited: Duration,
}

impl Backoff<'_> {
    /// Records a failed attempt and returns how long to wait before the next
    /// one, or `None` once the attempt limit or the wait budget is used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.config.max_attempts {
            return None;
        }

        let remaining = self.config.max_elapsed.saturating_sub(self.waited);
        if remaining.is_zero() {
            return None;
        }

        let delay = self
            .config
            .calculate_delay(self.failures - 1)
            .min(remaining);
        self.waited += delay;
        Some(delay)
    }

    pub fn attempts(&self) -> u32 {
        self.failures
    }

    pub fn waited(&self) -> Duration {
        self.waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32, max_elapsed: Duration) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            max_elapsed,
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_backoff_timing() {
        let config = config(5, Duration::from_secs(60));
        let delays = (0..5)
            .map(|attempt| config.calculate_delay(attempt))
            .collect::<Vec<_>>();

        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        assert_eq!(delays[3], Duration::from_millis(800));
        assert_eq!(delays[4], Duration::from_millis(1600));
    }

    #[test]
    fn test_max_delay_cap() {
        let mut config = config(10, Duration::from_secs(60));
        config.max_delay = Duration::from_secs(5);
        assert_eq!(config.calculate_delay(10), Duration::from_secs(5));
        assert_eq!(config.calculate_delay(200), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut config = config(5, Duration::from_secs(60));
        config.jitter = true;
        for _ in 0..50 {
            let delay = config.calculate_delay(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_backoff_stops_at_attempt_limit() {
        let config = config(3, Duration::from_secs(60));
        let mut backoff = config.backoff();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_backoff_respects_total_wait_budget() {
        let config = config(100, Duration::from_millis(350));
        let mut backoff = config.backoff();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        // Only 50ms of budget left.
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(50)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.waited(), Duration::from_millis(350));
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let config = config(1, Duration::from_secs(60));
        assert_eq!(config.backoff().next_delay(), None);
    }
}
