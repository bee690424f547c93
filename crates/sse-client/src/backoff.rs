//! Reconnect policy with jittered exponential back-off.

use std::time::Duration;

use rand::Rng;

use crate::error::StreamError;

/// Controls how a stream reconnects after a connection drop.
///
/// `Duration::ZERO` for `max_elapsed_time` or `idle_timeout`, and `0` for
/// `max_retries`, disable the respective limit.
#[derive(Debug, Clone)]
pub struct ReconnectionConfig {
    /// When `false`, the first failure ends the stream.
    pub enabled: bool,
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Cap on the computed (pre-jitter) delay.
    pub max_delay: Duration,
    /// Growth factor per failed attempt.  Must be greater than 1.0.
    pub backoff_multiplier: f64,
    /// Relative jitter in `[0.0, 1.0]`.
    pub jitter_factor: f64,
    /// Failed attempts allowed before giving up.
    pub max_retries: u32,
    /// Wall-clock budget measured from the start of the stream.
    pub max_elapsed_time: Duration,
    /// A connection that stays up this long resets the attempt counter.
    pub reset_interval: Duration,
    /// Silence on an open connection after which it is treated as dead.
    pub idle_timeout: Duration,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            max_retries: 0, // unlimited
            max_elapsed_time: Duration::ZERO,
            reset_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl From<&ags_domain::config::ReconnectConfig> for ReconnectionConfig {
    fn from(cfg: &ags_domain::config::ReconnectConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            backoff_multiplier: cfg.backoff_multiplier,
            jitter_factor: cfg.jitter_factor,
            max_retries: cfg.max_retries,
            max_elapsed_time: Duration::from_millis(cfg.max_elapsed_ms),
            reset_interval: Duration::from_millis(cfg.reset_interval_ms),
            idle_timeout: Duration::from_millis(cfg.idle_timeout_ms),
        }
    }
}

impl ReconnectionConfig {
    pub fn validate(&self) -> Result<(), StreamError> {
        if !(self.backoff_multiplier > 1.0) {
            return Err(StreamError::Config(format!(
                "backoff_multiplier must be greater than 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(StreamError::Config(format!(
                "jitter_factor must be within [0.0, 1.0], got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }

    /// Delay before the next attempt, given how many attempts have failed.
    ///
    /// Attempt `0` is the initial connect and never waits.  Otherwise the
    /// delay is `initial_delay * multiplier^(attempt-1)`, capped at
    /// `max_delay`, then scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_with_rng(attempt, &mut rand::rng())
    }

    /// Same as [`delay_for_attempt`](Self::delay_for_attempt) with a
    /// caller-supplied random source.
    pub fn delay_with_rng<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = self.base_delay_nanos(attempt);
        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        let scaled = if jitter > 0.0 {
            base * (1.0 + rng.random_range(-jitter..=jitter))
        } else {
            base
        };
        Duration::from_nanos(scaled.max(0.0).round() as u64)
    }

    /// Delay for the retry triggered by `err`.  A server-specified wait
    /// (`Retry-After`) replaces the computed value and skips jitter.
    pub fn delay_for_error(&self, attempt: u32, err: &StreamError) -> Duration {
        match err.retry_after() {
            Some(wait) => wait,
            None => self.delay_for_attempt(attempt),
        }
    }

    /// Whether `failed_attempts` has used up the retry budget.
    pub fn should_give_up(&self, failed_attempts: u32) -> bool {
        self.max_retries > 0 && failed_attempts >= self.max_retries
    }

    /// Whether `elapsed` is past the wall-clock budget.
    pub fn elapsed_exceeded(&self, elapsed: Duration) -> bool {
        !self.max_elapsed_time.is_zero() && elapsed > self.max_elapsed_time
    }

    /// Idle timeout, or `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (!self.idle_timeout.is_zero()).then_some(self.idle_timeout)
    }

    fn base_delay_nanos(&self, attempt: u32) -> f64 {
        let exponent = (attempt - 1).min(i32::MAX as u32) as i32;
        let grown = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        grown.min(self.max_delay.as_nanos() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> ReconnectionConfig {
        ReconnectionConfig {
            jitter_factor: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn default_policy_values() {
        let p = ReconnectionConfig::default();
        assert_eq!(p.initial_delay, Duration::from_millis(250));
        assert_eq!(p.max_delay, Duration::from_secs(30));
        assert_eq!(p.backoff_multiplier, 2.0);
        assert_eq!(p.jitter_factor, 0.2);
        assert_eq!(p.max_retries, 0);
        assert_eq!(p.reset_interval, Duration::from_secs(60));
        assert_eq!(p.idle_timeout, Duration::from_secs(300));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn first_attempt_is_immediate() {
        assert_eq!(ReconnectionConfig::default().delay_for_attempt(0), Duration::ZERO);
        assert_eq!(no_jitter().delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn exact_exponential_growth_without_jitter() {
        let p = no_jitter();
        for attempt in 1..=12u32 {
            let expected = Duration::from_millis(250)
                .saturating_mul(2u32.pow(attempt - 1))
                .min(Duration::from_secs(30));
            assert_eq!(p.delay_for_attempt(attempt), expected, "attempt {attempt}");
        }
    }

    #[test]
    fn delay_capped_at_max() {
        let p = ReconnectionConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 10.0,
            ..no_jitter()
        };
        assert_eq!(p.delay_for_attempt(10), Duration::from_secs(30));
        assert_eq!(p.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let p = ReconnectionConfig::default();
        let mut rng = rand::rng();
        for attempt in [1u32, 4, 10] {
            let base = no_jitter().delay_for_attempt(attempt).as_secs_f64();
            for _ in 0..1000 {
                let d = p.delay_with_rng(attempt, &mut rng).as_secs_f64();
                assert!(d >= base * 0.8 - 1e-9, "{d} < {}", base * 0.8);
                assert!(d <= base * 1.2 + 1e-9, "{d} > {}", base * 1.2);
            }
        }
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let p = ReconnectionConfig::default();
        let err = StreamError::Status {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(120)),
        };
        assert_eq!(p.delay_for_error(1, &err), Duration::from_secs(120));
        assert_eq!(p.delay_for_error(9, &err), Duration::from_secs(120));

        let plain = no_jitter();
        assert_eq!(plain.delay_for_error(1, &StreamError::Eof), Duration::from_millis(250));
    }

    #[test]
    fn should_give_up_when_limited() {
        let p = ReconnectionConfig {
            max_retries: 5,
            ..Default::default()
        };
        assert!(!p.should_give_up(4));
        assert!(p.should_give_up(5));
        assert!(p.should_give_up(6));
    }

    #[test]
    fn unlimited_never_gives_up() {
        let p = ReconnectionConfig::default();
        assert!(!p.should_give_up(1_000_000));
        assert!(!p.elapsed_exceeded(Duration::from_secs(86_400)));
    }

    #[test]
    fn elapsed_limit() {
        let p = ReconnectionConfig {
            max_elapsed_time: Duration::from_millis(500),
            ..Default::default()
        };
        assert!(!p.elapsed_exceeded(Duration::from_millis(500)));
        assert!(p.elapsed_exceeded(Duration::from_millis(501)));
    }

    #[test]
    fn invalid_policies_rejected() {
        let p = ReconnectionConfig {
            backoff_multiplier: 1.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());

        let p = ReconnectionConfig {
            jitter_factor: -0.1,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn converts_from_operator_config() {
        let cfg = ags_domain::config::ReconnectConfig {
            max_retries: 7,
            idle_timeout_ms: 0,
            ..Default::default()
        };
        let p = ReconnectionConfig::from(&cfg);
        assert_eq!(p.max_retries, 7);
        assert_eq!(p.idle_timeout(), None);
        assert_eq!(p.initial_delay, Duration::from_millis(250));
    }
}
