//! Time source for cache bookkeeping
//!
//! [`VisualCache`](crate::cache::VisualCache) never calls `Utc::now()`
//! directly; it asks an injected [`Clock`]. Production code uses
//! [`SystemClock`]; tests drive expiry with [`ManualClock`] instead of
//! sleeping. The resilience layer is not clock-driven: retry contexts and
//! error reports are stamped with the system time.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of wall-clock timestamps
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock with millisecond resolution
///
/// Clones share the same underlying instant, so a test can hand one clone to
/// the cache and keep another to move time forward.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Add a std duration to a timestamp, saturating instead of overflowing
pub(crate) fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Elapsed time between two instants, zero if `later` precedes `earlier`
pub(crate) fn elapsed_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance(Duration::from_millis(1500));

        let elapsed = clock.now() - start;
        assert!(elapsed.num_milliseconds() >= 1499 && elapsed.num_milliseconds() <= 1500);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::default();
        let target = Utc::now() + chrono::Duration::days(2);
        clock.set(target);
        assert_eq!(clock.now().timestamp_millis(), target.timestamp_millis());
    }

    #[test]
    fn test_elapsed_between_is_never_negative() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(3);
        assert_eq!(elapsed_between(earlier, now), Duration::from_secs(3));
        assert_eq!(elapsed_between(now, earlier), Duration::ZERO);
    }

    #[test]
    fn test_add_duration_saturates() {
        let far = add_duration(DateTime::<Utc>::MAX_UTC, Duration::from_secs(10));
        assert_eq!(far, DateTime::<Utc>::MAX_UTC);
    }
}
