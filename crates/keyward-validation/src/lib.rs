//! Background session validation for Keyward.
//!
//! Lazy validation only catches a stale session when someone touches it.
//! Sessions that are simply abandoned would sit in the store forever, so
//! [`ValidationScheduler`] runs a periodic sweep that calls
//! [`SessionManager::validate_sessions`] and expires whatever has gone idle.
//!
//! # Task model
//!
//! The scheduler owns exactly one tokio task plus a `watch` channel used to
//! cancel it:
//!
//! ```text
//! start() ──spawn──→ loop {
//!                      select! {
//!                        shutdown.changed() → break
//!                        interval.tick()    → spawn_blocking(sweep).await
//!                      }
//!                    }
//! stop().await ──send(true)──→ task breaks ──→ JoinHandle awaited
//! ```
//!
//! The sweep itself runs on tokio's blocking pool, since store calls and
//! listener callbacks are synchronous and may be slow. The loop awaits it
//! before selecting again, so there is still one sweep in flight at a time.
//! The interval uses
//! [`MissedTickBehavior::Delay`], so a sweep that overruns pushes the next
//! tick back instead of firing a burst. `stop` waits for the task to finish,
//! so a sweep in progress completes and none starts afterwards.
//!
//! Dropping the scheduler without calling `stop` drops the channel sender;
//! the task sees that and exits on its next poll.

use std::sync::Arc;
use std::time::Duration;

use keyward_session::{SessionManager, SessionStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the validation sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Whether [`ValidationScheduler::start`] spawns anything at all.
    /// Default: `true`.
    pub enabled: bool,

    /// Fixed sweep interval in milliseconds.
    ///
    /// `None` derives it from the manager's global timeout (one sixth of
    /// it), so sessions are reaped reasonably soon after they expire.
    pub interval_millis: Option<u64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_millis: None,
        }
    }
}

impl ValidationConfig {
    /// Shortest allowed interval. Anything faster just burns store reads.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Interval used when expiration is globally disabled (timeout `<= 0`)
    /// and no explicit interval was set. Sessions can still carry their own
    /// positive override, so the sweep keeps running, just rarely.
    pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(60 * 60);

    /// Config with a fixed interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_millis: Some(interval.as_millis() as u64),
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ValidationScheduler::new`]. An explicit
    /// interval below [`Self::MIN_INTERVAL`] is raised to it.
    pub fn validated(mut self) -> Self {
        let min = Self::MIN_INTERVAL.as_millis() as u64;
        if let Some(ms) = self.interval_millis {
            if ms < min {
                warn!(
                    interval_ms = ms,
                    min_ms = min,
                    "validation interval below minimum, clamping"
                );
                self.interval_millis = Some(min);
            }
        }
        self
    }

    /// The interval the sweep actually runs at, given the manager's current
    /// global timeout.
    pub fn effective_interval(&self, global_timeout_millis: i64) -> Duration {
        let interval = match self.interval_millis {
            Some(ms) => Duration::from_millis(ms),
            None if global_timeout_millis <= 0 => Self::FALLBACK_INTERVAL,
            None => Duration::from_millis(global_timeout_millis as u64 / 6),
        };
        interval.max(Self::MIN_INTERVAL)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Running totals for the sweep task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps that enumerated the store successfully.
    pub total_sweeps: u64,
    /// Sessions expired across all sweeps.
    pub total_expired: u64,
    /// Sweeps aborted because the store couldn't enumerate its sessions, or
    /// because the sweep panicked.
    pub failed_sweeps: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodically expires idle sessions of one [`SessionManager`].
///
/// Must be started from within a tokio runtime.
pub struct ValidationScheduler<S: SessionStore> {
    manager: Arc<SessionManager<S>>,
    config: ValidationConfig,
    metrics: Arc<Mutex<SweepMetrics>>,
    task: Option<RunningTask>,
}

impl<S: SessionStore> ValidationScheduler<S> {
    pub fn new(manager: Arc<SessionManager<S>>, config: ValidationConfig) -> Self {
        Self {
            manager,
            config: config.validated(),
            metrics: Arc::new(Mutex::new(SweepMetrics::default())),
            task: None,
        }
    }

    /// Spawns the sweep task.
    ///
    /// Idempotent: a second call while running does nothing. Does nothing
    /// either when the config is disabled. The interval is resolved now,
    /// against the manager's current global timeout; restart the scheduler
    /// to pick up a changed timeout.
    pub fn start(&mut self) {
        if !self.config.enabled {
            debug!("session validation disabled, not starting sweep");
            return;
        }
        if self.is_running() {
            debug!("session validation already running");
            return;
        }

        let period = self
            .config
            .effective_interval(self.manager.global_session_timeout());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(
            Arc::clone(&self.manager),
            Arc::clone(&self.metrics),
            period,
            shutdown_rx,
        ));

        info!(
            interval_ms = period.as_millis() as u64,
            "session validation started"
        );
        self.task = Some(RunningTask { shutdown, handle });
    }

    /// Stops the sweep task and waits for it to exit.
    ///
    /// When this returns no sweep is running and none will start. Calling it
    /// on a stopped scheduler is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        // A send error means the task already exited; joining still works.
        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            warn!(error = %e, "session validation task ended abnormally");
        }
        info!("session validation stopped");
    }

    /// `true` between `start` and `stop` while the task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Snapshot of the sweep totals so far.
    pub fn metrics(&self) -> SweepMetrics {
        self.metrics.lock().clone()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Runs one sweep immediately on the caller's thread, outside the
    /// schedule. Updates the same metrics as scheduled sweeps.
    pub fn sweep_now(&self) -> usize {
        sweep(&self.manager, &self.metrics)
    }
}

async fn sweep_loop<S: SessionStore>(
    manager: Arc<SessionManager<S>>,
    metrics: Arc<Mutex<SweepMetrics>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // First tick one full period out; a sweep right at startup finds nothing.
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // Err: the scheduler was dropped without stop().
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                trace!("session validation tick");
                // Store calls and listener callbacks are synchronous; keep
                // them off the async workers. Awaiting here keeps a single
                // sweep in flight and lets `stop` join it.
                let run = tokio::task::spawn_blocking({
                    let manager = Arc::clone(&manager);
                    let metrics = Arc::clone(&metrics);
                    move || sweep(&manager, &metrics)
                });
                if let Err(e) = run.await {
                    metrics.lock().failed_sweeps += 1;
                    warn!(error = %e, "session validation sweep panicked");
                }
            }
        }
    }

    debug!("session validation task exiting");
}

fn sweep<S: SessionStore>(
    manager: &SessionManager<S>,
    metrics: &Mutex<SweepMetrics>,
) -> usize {
    match manager.validate_sessions() {
        Ok(expired) => {
            let mut m = metrics.lock();
            m.total_sweeps += 1;
            m.total_expired += expired.len() as u64;
            if !expired.is_empty() {
                debug!(expired = expired.len(), "sweep expired sessions");
            }
            expired.len()
        }
        Err(e) => {
            metrics.lock().failed_sweeps += 1;
            warn!(error = %e, "session validation sweep failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_interval_defaults_to_sixth_of_timeout() {
        let cfg = ValidationConfig::default();
        assert_eq!(
            cfg.effective_interval(30 * 60 * 1000),
            Duration::from_secs(5 * 60)
        );
    }

    #[test]
    fn test_effective_interval_enforces_minimum() {
        let cfg = ValidationConfig::default();
        assert_eq!(cfg.effective_interval(100), ValidationConfig::MIN_INTERVAL);
    }

    #[test]
    fn test_effective_interval_disabled_timeout_uses_fallback() {
        let cfg = ValidationConfig::default();
        assert_eq!(cfg.effective_interval(0), ValidationConfig::FALLBACK_INTERVAL);
        assert_eq!(cfg.effective_interval(-5), ValidationConfig::FALLBACK_INTERVAL);
    }

    #[test]
    fn test_effective_interval_explicit_wins() {
        let cfg = ValidationConfig::with_interval(Duration::from_secs(7));
        assert_eq!(cfg.effective_interval(0), Duration::from_secs(7));
        assert_eq!(cfg.effective_interval(600_000), Duration::from_secs(7));
    }

    #[test]
    fn test_validated_clamps_short_interval() {
        let cfg = ValidationConfig::with_interval(Duration::from_millis(10))
            .validated();
        assert_eq!(cfg.interval_millis, Some(1_000));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let cfg: ValidationConfig =
            serde_json::from_str(r#"{"interval_millis": 2500}"#).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.interval_millis, Some(2_500));
    }
}
