//! Timestamp freshness checks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ReplayError;

/// Default maximum payload age.
pub const DEFAULT_MAX_AGE_MS: u64 = 5_000;
/// Default tolerance for client clocks running ahead of the server.
pub const DEFAULT_MAX_FUTURE_SKEW_MS: u64 = 1_000;

/// Acceptance window for payload timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayWindow {
    /// Oldest accepted age in milliseconds (inclusive).
    pub max_age_ms: u64,
    /// How far in the future a timestamp may be (inclusive).
    pub max_future_skew_ms: u64,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
            max_future_skew_ms: DEFAULT_MAX_FUTURE_SKEW_MS,
        }
    }
}

impl ReplayWindow {
    /// Checks `timestamp_ms` against `now_ms`.
    pub fn check(&self, timestamp_ms: i64, now_ms: i64) -> Result<(), ReplayError> {
        check_freshness(timestamp_ms, now_ms, self)
    }
}

/// Rejects timestamps older than `max_age_ms` or further ahead than
/// `max_future_skew_ms`. Both bounds are inclusive.
pub fn check_freshness(
    timestamp_ms: i64,
    now_ms: i64,
    window: &ReplayWindow,
) -> Result<(), ReplayError> {
    let age = i128::from(now_ms) - i128::from(timestamp_ms);
    if age > i128::from(window.max_age_ms) {
        return Err(ReplayError::Expired {
            age_ms: clamp(age),
            max_age_ms: window.max_age_ms,
        });
    }
    if -age > i128::from(window.max_future_skew_ms) {
        return Err(ReplayError::FromFuture {
            ahead_ms: clamp(-age),
            max_skew_ms: window.max_future_skew_ms,
        });
    }
    Ok(())
}

fn clamp(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    /// Creates a clock reading `now_ms`.
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    /// Sets the current time.
    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    /// Moves the clock forward (or back, for negative values).
    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn ten_seconds_old_is_expired() {
        let err = check_freshness(NOW - 10_000, NOW, &ReplayWindow::default()).unwrap_err();
        assert_eq!(
            err,
            ReplayError::Expired {
                age_ms: 10_000,
                max_age_ms: 5_000
            }
        );
    }

    #[test]
    fn one_second_old_is_fresh() {
        assert!(check_freshness(NOW - 1_000, NOW, &ReplayWindow::default()).is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = ReplayWindow::default();
        assert!(window.check(NOW - 5_000, NOW).is_ok());
        assert!(window.check(NOW - 5_001, NOW).is_err());
        assert!(window.check(NOW + 1_000, NOW).is_ok());
        assert!(matches!(
            window.check(NOW + 1_001, NOW),
            Err(ReplayError::FromFuture { ahead_ms: 1_001, .. })
        ));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let window = ReplayWindow::default();
        assert!(window.check(i64::MIN, i64::MAX).is_err());
        assert!(window.check(i64::MAX, i64::MIN).is_err());
    }

    #[test]
    fn manual_clock_moves_on_request() {
        let clock = ManualClock::new(NOW);
        clock.advance(6_000);
        assert_eq!(clock.now_ms(), NOW + 6_000);
        clock.set(1);
        assert_eq!((&clock).now_ms(), 1);
    }

    #[test]
    fn window_deserializes_with_defaults() {
        let window: ReplayWindow = serde_json::from_str(r#"{"max_age_ms": 2000}"#).unwrap();
        assert_eq!(window.max_age_ms, 2_000);
        assert_eq!(window.max_future_skew_ms, DEFAULT_MAX_FUTURE_SKEW_MS);
    }
}
