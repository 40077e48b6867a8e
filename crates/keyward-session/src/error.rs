//! Error types for the session layer.

use keyward_types::SessionId;

use crate::SessionState;

/// Errors that can occur during session management.
///
/// These cover the full lifecycle of a session: lookup, lazy validation,
/// mutation of a dead session, and failures of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given id.
    /// Either it never existed or it was already stopped/expired and deleted.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session sat idle longer than its timeout.
    /// Detecting this terminates the session as a side effect, so the next
    /// call with the same id fails with `NotFound`.
    #[error("session {0} expired")]
    Expired(SessionId),

    /// The store handed back a session that is already terminal.
    /// Only `stop` tolerates this (as a no-op).
    #[error("session {id} is {state} and can no longer be used")]
    InvalidState { id: SessionId, state: SessionState },

    /// The session factory requires an originating host and none was given.
    #[error("a host is required to start a session")]
    HostRequired,

    /// The backing store failed. The operation was aborted; nothing about
    /// its partial progress should be assumed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Errors reported by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `create` was called for an id that is already stored.
    #[error("session {0} already exists")]
    Conflict(SessionId),

    /// `update` was called for an id the store doesn't know.
    #[error("session {0} is not stored")]
    Missing(SessionId),

    /// Any other backend failure (I/O, serialization, connection loss).
    #[error("session store failure: {0}")]
    Backend(String),
}
