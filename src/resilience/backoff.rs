//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::DialBackoffConfig;

/// Delay schedule between dial attempts.
///
/// The delay before retry `n` (1-based) is `base * factor^(n-1)`, capped at
/// `max` when set, plus up to `jitter` of itself at random. No delay follows
/// the final attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub jitter: f64,
    pub steps: u32,
    pub max: Option<Duration>,
}

impl Backoff {
    /// Schedule from config; the first delay equals the connect timeout.
    pub fn from_config(connect_timeout: Duration, config: &DialBackoffConfig) -> Self {
        Self {
            base: connect_timeout,
            factor: config.factor,
            jitter: config.jitter,
            steps: config.steps.max(1),
            max: (config.max_delay_ms > 0).then(|| Duration::from_millis(config.max_delay_ms)),
        }
    }

    /// Delay before the retry following failed attempt `attempt` (1-based),
    /// without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let nanos = (self.base.as_nanos() as f64 * self.factor.powi(exponent)).round();
        let delay = if nanos >= u64::MAX as f64 {
            Duration::MAX
        } else {
            Duration::from_nanos(nanos as u64)
        };

        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Delay before the retry following failed attempt `attempt`, with jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }

        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        let nanos = (delay.as_nanos() as f64 * extra) as u64;
        delay.saturating_add(Duration::from_nanos(nanos))
    }

    /// Shortest possible time spent sleeping before giving up.
    pub fn min_total(&self) -> Duration {
        (1..self.steps).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(self.base_delay(attempt))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(steps: u32) -> Backoff {
        Backoff {
            base: Duration::from_millis(100),
            factor: 2.0,
            jitter: 0.1,
            steps,
            max: None,
        }
    }

    #[test]
    fn delays_grow_by_factor() {
        let b = schedule(5);
        assert_eq!(b.base_delay(1), Duration::from_millis(100));
        assert_eq!(b.base_delay(2), Duration::from_millis(200));
        assert_eq!(b.base_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let b = schedule(5);
        for _ in 0..100 {
            let d = b.delay(2);
            assert!(d >= Duration::from_millis(200));
            assert!(d <= Duration::from_millis(220));
        }
    }

    #[test]
    fn cap_applies() {
        let mut b = schedule(10);
        b.max = Some(Duration::from_millis(300));
        assert_eq!(b.base_delay(8), Duration::from_millis(300));
    }

    #[test]
    fn min_total_skips_final_attempt() {
        assert_eq!(schedule(1).min_total(), Duration::ZERO);
        assert_eq!(schedule(3).min_total(), Duration::from_millis(300));
    }

    #[test]
    fn from_config_uses_connect_timeout_as_base() {
        let config = DialBackoffConfig::default();
        let b = Backoff::from_config(Duration::from_millis(500), &config);
        assert_eq!(b.base, Duration::from_millis(500));
        assert_eq!(b.steps, 5);
        assert_eq!(b.max, None);
        assert_eq!(b.base_delay(2), Duration::from_millis(750));
    }
}
