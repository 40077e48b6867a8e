//! Time source used for every session timestamp.
//!
//! The session manager never reads the system clock directly. It asks an
//! injected [`Clock`], which makes expiration fully deterministic in tests:
//! hand the manager a [`ManualClock`], advance it by 150 ms, and the session
//! is idle for exactly 150 ms. No sleeping, no flakiness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of "now", in milliseconds.
///
/// Implementations should be monotonic enough that successive calls do not
/// go backwards in practice. The session types clamp timestamps so a small
/// backwards step can't break their ordering invariants.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Wall-clock (rather than `Instant`) because timestamps are persisted by
/// the store and must stay meaningful across process restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the manager.
///
/// ```rust
/// use std::time::Duration;
/// use keyward_session::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// let handle = clock.clone();
/// handle.advance(Duration::from_millis(150));
/// assert_eq!(clock.now_millis(), 1_150);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z in millis.
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let a = ManualClock::new(0);
        let b = a.clone();
        a.advance(Duration::from_millis(40));
        b.advance(Duration::from_millis(2));
        assert_eq!(a.now_millis(), 42);
        assert_eq!(b.now_millis(), 42);
    }

    #[test]
    fn test_manual_clock_set_jumps() {
        let c = ManualClock::default();
        c.set(9_000);
        assert_eq!(c.now_millis(), 9_000);
    }
}
