//! The persistence contract sessions live behind.
//!
//! Keyward doesn't ship a database. It defines [`SessionStore`], a five-method
//! contract, and lets the host plug in Redis, SQL, a file, or anything else.
//! [`MemorySessionStore`] is the reference implementation for tests and
//! single-process embedding.

use std::collections::HashMap;
use std::sync::Arc;

use keyward_types::SessionId;
use parking_lot::RwLock;

use crate::{Session, StoreError};

/// Create/read/update/delete access to sessions, keyed by id.
///
/// Each call must be individually atomic. The manager makes no promise that
/// a read followed by an update is atomic as a pair; two concurrent touches
/// on the same id may interleave here.
///
/// The session manager never caches what it reads: every operation
/// re-fetches. If a store wants caching, that's its own business.
pub trait SessionStore: Send + Sync + 'static {
    /// Persists a brand-new session and returns the id it is stored under
    /// (normally `session.id()`).
    fn create(&self, session: &Session) -> Result<SessionId, StoreError>;

    /// Fetches a session. `Ok(None)` means "no such id".
    fn read(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Replaces the stored record with `session`.
    fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Removes the record. Called exactly once per session, after it has
    /// reached a terminal state.
    fn delete(&self, session: &Session) -> Result<(), StoreError>;

    /// Snapshot of all sessions currently `Active`, for the validation sweep.
    /// Finite, and safe to call again for a fresh snapshot.
    fn active_sessions(&self) -> Result<Vec<Session>, StoreError>;
}

/// Sharing a store behind `Arc` keeps it usable as a store, so a caller can
/// hold one handle and give the manager another.
impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn create(&self, session: &Session) -> Result<SessionId, StoreError> {
        (**self).create(session)
    }

    fn read(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        (**self).read(id)
    }

    fn update(&self, session: &Session) -> Result<(), StoreError> {
        (**self).update(session)
    }

    fn delete(&self, session: &Session) -> Result<(), StoreError> {
        (**self).delete(session)
    }

    fn active_sessions(&self) -> Result<Vec<Session>, StoreError> {
        (**self).active_sessions()
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-process [`SessionStore`] backed by a `HashMap`.
///
/// The map sits behind a `parking_lot::RwLock`: many concurrent readers,
/// one writer at a time, and each method holds the lock only for its own
/// single map operation.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session: &Session) -> Result<SessionId, StoreError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session.id()) {
            return Err(StoreError::Conflict(session.id().clone()));
        }
        sessions.insert(session.id().clone(), session.clone());
        Ok(session.id().clone())
    }

    fn read(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session.id()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(session.id().clone())),
        }
    }

    fn delete(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.write().remove(session.id());
        Ok(())
    }

    fn active_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| !s.is_terminal())
            .cloned()
            .collect())
    }
}
