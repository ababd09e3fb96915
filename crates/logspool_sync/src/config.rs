//! Configuration for segment upload.

use crate::network::NetworkPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Configuration for uploading segments to a remote collector.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Collector endpoint that receives segment bodies via POST.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Which networks uploads may use.
    pub network_policy: NetworkPolicy,
    /// Backoff for the periodic retry loop.
    pub retry: RetryConfig,
    /// How often the retry loop re-submits pending segments when healthy.
    pub retry_interval: Duration,
}

impl UploadConfig {
    /// Creates a configuration for the given collector URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            network_policy: NetworkPolicy::default(),
            retry: RetryConfig::default(),
            retry_interval: Duration::from_secs(60),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the network policy.
    #[must_use]
    pub fn with_network_policy(mut self, policy: NetworkPolicy) -> Self {
        self.network_policy = policy;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the healthy retry interval.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of consecutive failures after which the delay stops growing.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15 * 60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Returns how long the retry loop waits after `failures` consecutive
    /// failed passes.
    ///
    /// Zero failures means no delay. Growth stops once `failures` reaches
    /// `max_attempts`, and the result never exceeds `max_delay`. With
    /// jitter enabled up to a quarter of the delay is shaved off, so a
    /// fleet of clients that failed together spreads out again.
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        let Some(step) = failures.checked_sub(1) else {
            return Duration::ZERO;
        };
        let step = step.min(self.max_attempts.saturating_sub(1));
        let growth = self
            .backoff_multiplier
            .max(1.0)
            .powi(i32::try_from(step).unwrap_or(i32::MAX));

        let capped = Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * growth)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay));

        if self.add_jitter {
            capped.mul_f64(1.0 - 0.25 * jitter_fraction())
        } else {
            capped
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

static JITTER_STATE: AtomicU64 = AtomicU64::new(0);

/// Pseudo-random fraction in `[0, 1)`.
///
/// An xorshift step over process-wide state, seeded from the clock on first
/// use.
fn jitter_fraction() -> f64 {
    let mut x = JITTER_STATE.load(Ordering::Relaxed);
    if x == 0 {
        x = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0x9e37_79b9_7f4a_7c15, |d| d.as_nanos() as u64)
            | 1;
    }
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    JITTER_STATE.store(x, Ordering::Relaxed);
    (x >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_config_builder() {
        let config = UploadConfig::new("https://collector.example.com/logs")
            .with_timeout(Duration::from_secs(5))
            .with_retry_interval(Duration::from_secs(10));

        assert_eq!(config.url, "https://collector.example.com/logs");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry_interval, Duration::from_secs(10));
        assert!(!config.network_policy.allow_expensive);
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(UploadConfig::new("x").timeout, Duration::from_secs(30));
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn retry_delay_stops_growing_after_max_attempts() {
        let config = RetryConfig::new(3)
            .with_initial_delay(Duration::from_millis(100))
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(3), config.delay_for_attempt(50));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        for failures in 1..20 {
            assert!(config.delay_for_attempt(failures) <= Duration::from_secs(5));
        }
        assert!(config.delay_for_attempt(5) >= Duration::from_millis(3750));
    }

    #[test]
    fn huge_growth_saturates_at_max() {
        let config = RetryConfig::new(u32::MAX)
            .with_backoff_multiplier(1e300)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(10), config.max_delay);
    }

    #[test]
    fn jitter_fraction_stays_in_unit_range() {
        for _ in 0..1000 {
            let f = jitter_fraction();
            assert!((0.0..1.0).contains(&f));
        }
    }
}
