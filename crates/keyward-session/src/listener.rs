//! Session lifecycle notifications.
//!
//! Anything that wants to know when sessions start, stop, or expire
//! implements [`SessionListener`] and registers with the manager's
//! [`ListenerRegistry`]. Typical listeners write audit logs, release
//! per-session resources, or update presence counters.
//!
//! # Failure isolation
//!
//! Dispatch is synchronous: `start`, `stop`, and expiration do not return
//! until every listener ran. A listener that returns `Err` or panics is
//! logged and recorded in the [`DispatchReport`], and the remaining
//! listeners still run. Whatever the manager does after dispatch (deleting
//! the session from the store) happens regardless.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::Session;

/// Error type listeners may return. Boxed so listeners can surface whatever
/// their own failure type is.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives session lifecycle notifications.
///
/// Every method has a no-op default, so a listener only overrides the
/// events it cares about.
pub trait SessionListener: Send + Sync {
    /// A session was just created and persisted.
    fn on_start(&self, _session: &Session) -> Result<(), ListenerError> {
        Ok(())
    }

    /// A session was explicitly stopped.
    fn on_stop(&self, _session: &Session) -> Result<(), ListenerError> {
        Ok(())
    }

    /// A session was found idle past its timeout and terminated.
    fn on_expiration(&self, _session: &Session) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// The lifecycle event being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Stop,
    Expiration,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Expiration => write!(f, "expiration"),
        }
    }
}

/// Handle returned by [`ListenerRegistry::add`], used to remove the
/// listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

/// One listener that failed during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub listener: ListenerId,
    pub reason: String,
}

/// Outcome of dispatching one event to every registered listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// How many listeners were invoked (successfully or not).
    pub notified: usize,
    /// The listeners that returned `Err` or panicked, in call order.
    pub failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    /// `true` if every listener succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered collection of session listeners.
///
/// Listeners are called in registration order. The lock is only held to
/// copy out the current list; callbacks run without it, so a listener may
/// safely add or remove listeners (the change applies to the next event).
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Arc<dyn SessionListener>)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener and returns its removal handle.
    pub fn add(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, listener));
        tracing::debug!(listener = %id, "session listener registered");
        id
    }

    /// Removes a listener. Returns `false` if the handle was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Notifies every listener of `event`, isolating failures.
    pub fn dispatch(
        &self,
        event: SessionEvent,
        session: &Session,
    ) -> DispatchReport {
        let snapshot: Vec<_> = self.entries.read().clone();
        let mut report = DispatchReport::default();

        for (id, listener) in snapshot {
            report.notified += 1;

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
                SessionEvent::Start => listener.on_start(session),
                SessionEvent::Stop => listener.on_stop(session),
                SessionEvent::Expiration => listener.on_expiration(session),
            }));

            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            tracing::warn!(
                listener = %id,
                %event,
                session_id = %session.id(),
                %reason,
                "session listener failed"
            );
            report.failures.push(ListenerFailure {
                listener: id,
                reason,
            });
        }

        report
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
