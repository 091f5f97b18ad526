/// Fixed-rate pacing for callers of rate-limited upstreams
///
/// A `Pacer` is a token bucket with a burst of one: the first permit is
/// granted immediately and every following permit is spaced at least one
/// interval after the previous one. Callers are expected to await permits
/// sequentially; the pacer never lets two permits through inside the same
/// interval, even when shared.
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PacerError {
    #[error("Pacing interval must be greater than zero")]
    ZeroInterval,
    #[error("Request ceiling must be greater than zero")]
    ZeroCeiling,
    #[error("Headroom must be within (0, 1], got {0}")]
    InvalidHeadroom(f64),
}

pub struct Pacer {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    interval: Duration,
}

impl Pacer {
    /// One permit per `interval`, no burst.
    pub fn with_interval(interval: Duration) -> Result<Self, PacerError> {
        let quota = Quota::with_period(interval)
            .ok_or(PacerError::ZeroInterval)?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            interval,
        })
    }

    /// Pace below a published ceiling of `max_per_second` requests.
    ///
    /// `headroom` is the fraction of the ceiling actually used, e.g. `0.66`
    /// against a 10 req/s ceiling yields ~6.6 req/s (~150ms spacing).
    pub fn under_ceiling(max_per_second: u32, headroom: f64) -> Result<Self, PacerError> {
        if max_per_second == 0 {
            return Err(PacerError::ZeroCeiling);
        }
        if !(headroom > 0.0 && headroom <= 1.0) {
            return Err(PacerError::InvalidHeadroom(headroom));
        }

        let per_second = f64::from(max_per_second) * headroom;
        Self::with_interval(Duration::from_secs_f64(1.0 / per_second))
    }

    /// Wait until the next permit is available.
    pub async fn ready(&self) {
        let started = Instant::now();
        self.limiter.until_ready().await;

        let waited = started.elapsed();
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "Pacer delayed caller");
        }
    }

    /// Minimum spacing between two permits.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_rejected() {
        let err = Pacer::with_interval(Duration::ZERO).unwrap_err();
        assert_eq!(err, PacerError::ZeroInterval);
    }

    #[test]
    fn test_under_ceiling_interval() {
        let pacer = Pacer::under_ceiling(10, 0.5).unwrap();
        assert_eq!(pacer.interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_under_ceiling_rejects_bad_input() {
        assert_eq!(
            Pacer::under_ceiling(0, 0.5).unwrap_err(),
            PacerError::ZeroCeiling
        );
        assert!(matches!(
            Pacer::under_ceiling(10, 1.5),
            Err(PacerError::InvalidHeadroom(_))
        ));
        assert!(matches!(
            Pacer::under_ceiling(10, 0.0),
            Err(PacerError::InvalidHeadroom(_))
        ));
    }

    #[tokio::test]
    async fn test_first_permit_is_immediate() {
        let pacer = Pacer::with_interval(Duration::from_secs(5)).unwrap();

        let start = Instant::now();
        pacer.ready().await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
