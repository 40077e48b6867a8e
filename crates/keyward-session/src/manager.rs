//! The session manager: owns the lifecycle of every session.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Creating sessions and persisting them through the [`SessionStore`]
//! - Touching sessions and mutating their attributes/timeouts
//! - Lazily validating each session on access (idle timeout check)
//! - Expiring stale sessions in bulk for the background sweep
//! - Notifying [`SessionListener`](crate::SessionListener)s of lifecycle events
//!
//! # Concurrency note
//!
//! `SessionManager` is `Sync` and every method takes `&self`. It keeps no
//! copy of any session: the store is the only shared mutable state, and each
//! operation re-reads from it. Two concurrent calls on the same id may
//! interleave at the store; each store call is atomic on its own, and that
//! is the whole guarantee.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use keyward_types::SessionId;
use serde_json::Value;

use crate::listener::{ListenerId, SessionEvent};
use crate::{
    Clock, ListenerRegistry, RandomIdFactory, Session, SessionConfig,
    SessionError, SessionFactory, SessionInit, SessionListener, SessionStore,
    SystemClock,
};

/// Manages all sessions held by one store.
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ [Active] ──touch()/set_attribute()/set_timeout()──┐
///                │  ↑                                            │
///                │  └────────────────────────────────────────────┘
///                ├──stop()──────────────→ [Stopped] ──→ store.delete
///                └──idle > timeout──────→ [Expired] ──→ store.delete
///                   (lazy on access, or validate_sessions())
/// ```
pub struct SessionManager<S: SessionStore> {
    store: S,

    /// Injected time source. Never read ambient time.
    clock: Arc<dyn Clock>,

    /// Builds each new record; [`RandomIdFactory`] unless replaced.
    factory: Arc<dyn SessionFactory>,

    /// Fallback idle timeout for sessions without an override.
    ///
    /// Atomic so it can be changed through `&self` while requests are in
    /// flight; it's a single independent value, so `Relaxed` is enough.
    global_timeout_millis: AtomicI64,

    listeners: ListenerRegistry,
}

impl<S: SessionStore> SessionManager<S> {
    /// Creates a manager over `store` using the system clock.
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a manager with an explicit time source.
    pub fn with_clock(
        store: S,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            factory: Arc::new(RandomIdFactory::new()),
            global_timeout_millis: AtomicI64::new(
                config.global_timeout_millis,
            ),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Replaces the session factory used by [`start`](Self::start).
    pub fn with_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Registers a lifecycle listener. See [`ListenerRegistry::add`].
    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregisters a lifecycle listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // =====================================================================
    // Global timeout
    // =====================================================================

    /// The idle timeout used by sessions that have no override.
    pub fn global_session_timeout(&self) -> i64 {
        self.global_timeout_millis.load(Ordering::Relaxed)
    }

    /// Changes the fallback idle timeout.
    ///
    /// Sessions with their own override are unaffected. Sessions without one
    /// resolve against the new value from their next validation onwards.
    pub fn set_global_session_timeout(&self, millis: i64) {
        self.global_timeout_millis.store(millis, Ordering::Relaxed);
        tracing::info!(timeout_ms = millis, "global session timeout changed");
    }

    // =====================================================================
    // Creation
    // =====================================================================

    /// Starts a new session and returns its id.
    ///
    /// `start_timestamp == last_access_time == now`. Listeners get `on_start`
    /// before this returns.
    ///
    /// Initial attributes with a `Value::Null` value are skipped, matching
    /// [`set_attribute`](Self::set_attribute).
    ///
    /// # Errors
    /// - whatever the [`SessionFactory`] refuses with (for example
    ///   [`SessionError::HostRequired`])
    /// - [`SessionError::Storage`] if the store rejects the session
    pub fn start(&self, init: SessionInit) -> Result<SessionId, SessionError> {
        let now = self.clock.now_millis();
        let mut session = self.factory.create(init.host, now)?;
        for (key, value) in init.attributes {
            if value.is_null() {
                continue;
            }
            session.set_attribute(key, value)?;
        }

        let id = self.store.create(&session)?;

        tracing::info!(
            session_id = %id,
            host = session.host().unwrap_or("-"),
            "session started"
        );

        self.listeners.dispatch(SessionEvent::Start, &session);
        Ok(id)
    }

    // =====================================================================
    // Lookup and lazy validation
    // =====================================================================

    /// Fetches a live session.
    ///
    /// Every other operation goes through here, so every operation performs
    /// lazy validation: a session idle past its timeout is expired on the
    /// spot (listeners notified, record deleted) and the call fails.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: unknown id (or already deleted)
    /// - [`SessionError::InvalidState`]: the store returned a terminal record
    /// - [`SessionError::Expired`]: idle timeout exceeded, now terminated
    /// - [`SessionError::Storage`]: the store failed
    pub fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        let session = self.read(id)?;

        if session.is_terminal() {
            return Err(SessionError::InvalidState {
                id: id.clone(),
                state: session.state(),
            });
        }

        if session.is_timed_out(
            self.clock.now_millis(),
            self.global_session_timeout(),
        ) {
            self.expire(session)?;
            return Err(SessionError::Expired(id.clone()));
        }

        Ok(session)
    }

    /// Returns `Ok(true)` if the session exists and is still usable.
    ///
    /// Like every other access this performs lazy validation, so asking about
    /// a stale session expires it. Unknown, terminal, and expired sessions
    /// answer `Ok(false)`.
    ///
    /// # Errors
    /// [`SessionError::Storage`] is passed through, not folded into `false`.
    pub fn is_valid(&self, id: &SessionId) -> Result<bool, SessionError> {
        match self.get_session(id) {
            Ok(_) => Ok(true),
            Err(SessionError::Storage(e)) => Err(SessionError::Storage(e)),
            Err(_) => Ok(false),
        }
    }

    /// Records activity on a session, resetting its idle clock.
    pub fn touch(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self.get_session(id)?;
        session.touch(self.clock.now_millis())?;
        self.store.update(&session)?;
        tracing::trace!(session_id = %id, "session touched");
        Ok(())
    }

    pub fn get_start_timestamp(
        &self,
        id: &SessionId,
    ) -> Result<u64, SessionError> {
        Ok(self.get_session(id)?.start_timestamp())
    }

    pub fn get_last_access_time(
        &self,
        id: &SessionId,
    ) -> Result<u64, SessionError> {
        Ok(self.get_session(id)?.last_access_time())
    }

    pub fn get_host(
        &self,
        id: &SessionId,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.get_session(id)?.host().map(str::to_owned))
    }

    // =====================================================================
    // Timeout
    // =====================================================================

    /// The session's effective idle timeout (override, else global default).
    pub fn get_timeout(&self, id: &SessionId) -> Result<i64, SessionError> {
        let session = self.get_session(id)?;
        Ok(session.effective_timeout(self.global_session_timeout()))
    }

    /// Overrides the idle timeout for one session. `<= 0` disables its
    /// expiration.
    pub fn set_timeout(
        &self,
        id: &SessionId,
        millis: i64,
    ) -> Result<(), SessionError> {
        let mut session = self.get_session(id)?;
        session.set_timeout(millis)?;
        self.store.update(&session)?;
        tracing::debug!(session_id = %id, timeout_ms = millis, "session timeout set");
        Ok(())
    }

    // =====================================================================
    // Attributes
    // =====================================================================

    pub fn get_attribute(
        &self,
        id: &SessionId,
        key: &str,
    ) -> Result<Option<Value>, SessionError> {
        Ok(self.get_session(id)?.attribute(key).cloned())
    }

    pub fn get_attribute_keys(
        &self,
        id: &SessionId,
    ) -> Result<Vec<String>, SessionError> {
        Ok(self.get_session(id)?.attribute_keys())
    }

    /// Stores an attribute and returns the previous value, if any.
    ///
    /// Setting `Value::Null` is the same as removing the key.
    pub fn set_attribute(
        &self,
        id: &SessionId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, SessionError> {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            return self.remove_attribute(id, &key);
        }

        let mut session = self.get_session(id)?;
        let previous = session.set_attribute(key, value)?;
        self.store.update(&session)?;
        Ok(previous)
    }

    /// Removes an attribute and returns its value, if it was present.
    ///
    /// The store is only updated when something was actually removed.
    pub fn remove_attribute(
        &self,
        id: &SessionId,
        key: &str,
    ) -> Result<Option<Value>, SessionError> {
        let mut session = self.get_session(id)?;
        let removed = session.remove_attribute(key)?;
        if removed.is_some() {
            self.store.update(&session)?;
        }
        Ok(removed)
    }

    // =====================================================================
    // Termination
    // =====================================================================

    /// Explicitly ends a session.
    ///
    /// Goes through the same lazy validation as every other operation, so an
    /// unknown or already-deleted id is [`SessionError::NotFound`]. A second
    /// `stop` on the same id therefore fails but fires no `on_stop` and
    /// deletes nothing. A terminal record still sitting in the store is a
    /// no-op. A session idle past its timeout is expired (listeners get
    /// `on_expiration`, not `on_stop`) and the call fails with
    /// [`SessionError::Expired`].
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: unknown id (or already deleted)
    /// - [`SessionError::Expired`]: idle timeout exceeded, now terminated
    /// - [`SessionError::Storage`]: the store failed
    pub fn stop(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self.read(id)?;

        if session.is_terminal() {
            tracing::debug!(
                session_id = %id,
                state = %session.state(),
                "stop on terminal session ignored"
            );
            return Ok(());
        }

        let now = self.clock.now_millis();
        if session.is_timed_out(now, self.global_session_timeout()) {
            self.expire(session)?;
            return Err(SessionError::Expired(id.clone()));
        }

        session.stop(now)?;
        self.store.update(&session)?;
        self.listeners.dispatch(SessionEvent::Stop, &session);
        self.store.delete(&session)?;

        tracing::info!(session_id = %id, "session stopped");
        Ok(())
    }

    /// Sweeps every active session in the store and expires the stale ones.
    ///
    /// This is what the background validation scheduler calls on each tick.
    /// A failure to expire one session is logged and does not stop the
    /// sweep; the ids of the sessions actually expired are returned.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the store can't enumerate its sessions.
    pub fn validate_sessions(&self) -> Result<Vec<SessionId>, SessionError> {
        let candidates = self.store.active_sessions()?;
        let total = candidates.len();
        let mut expired = Vec::new();

        for session in candidates {
            // Fresh `now` per session: a long sweep must not judge later
            // sessions against a stale instant.
            let now = self.clock.now_millis();
            if session.is_terminal()
                || !session.is_timed_out(now, self.global_session_timeout())
            {
                continue;
            }

            let id = session.id().clone();
            match self.expire(session) {
                Ok(()) => expired.push(id),
                Err(e) => tracing::warn!(
                    session_id = %id,
                    error = %e,
                    "failed to expire stale session"
                ),
            }
        }

        tracing::debug!(
            checked = total,
            expired = expired.len(),
            "session validation sweep finished"
        );
        Ok(expired)
    }

    /// The single expiration path shared by lazy and scheduled validation.
    ///
    /// Order matters: record the stop timestamp durably, notify listeners,
    /// then delete. Listener failures are isolated by the registry, so the
    /// delete always runs unless the store itself fails.
    fn expire(&self, mut session: Session) -> Result<(), SessionError> {
        session.expire(self.clock.now_millis())?;
        self.store.update(&session)?;
        self.listeners.dispatch(SessionEvent::Expiration, &session);
        self.store.delete(&session)?;

        tracing::info!(session_id = %session.id(), "session expired");
        Ok(())
    }

    fn read(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.store
            .read(id)?
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }
}

// =========================================================================
// Tests
// =========================================================================
