//! Session types: the data structures that represent one interaction window.
//!
//! A "session" is the server's record of a principal's ongoing interaction.
//! It tracks:
//! - WHO it is (`SessionId`, optional originating `host`)
//! - WHEN it started, was last used, and stopped
//! - HOW long it may sit idle (`timeout_override`, falling back to the
//!   manager's global default)
//! - WHAT the application stashed in it (`attributes`)
//! - WHERE it is in its lifecycle (`SessionState`)
//!
//! Timestamps are milliseconds from the manager's [`Clock`](crate::Clock).

use std::collections::HashMap;
use std::fmt;

use keyward_types::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// `#[serde(default)]` lets a host config file specify only the fields it
/// cares about; everything else falls back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle timeout applied to every session that has no per-session
    /// override.
    ///
    /// Default: 30 minutes. A value `<= 0` disables expiration.
    pub global_timeout_millis: i64,
}

impl SessionConfig {
    /// Default global timeout: 30 minutes.
    pub const DEFAULT_GLOBAL_TIMEOUT_MILLIS: i64 = 30 * 60 * 1000;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            global_timeout_millis: Self::DEFAULT_GLOBAL_TIMEOUT_MILLIS,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
///            ┌──(stop)──────→ Stopped
///   Active ──┤
///            └──(idle timeout)→ Expired
/// ```
///
/// `Stopped` and `Expired` are terminal: nothing leaves them, and exactly
/// one of the two ends any given session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Stopped,
    Expired,
}

impl SessionState {
    /// Returns `true` for `Stopped` and `Expired`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Stopped => write!(f, "stopped"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionInit
// ---------------------------------------------------------------------------

/// Data used to seed a new session in
/// [`SessionManager::start`](crate::SessionManager::start).
#[derive(Debug, Clone, Default)]
pub struct SessionInit {
    /// Originating location (IP address, device id, ...), if known.
    pub host: Option<String>,

    /// Attributes present from the moment the session exists.
    pub attributes: HashMap<String, Value>,
}

impl SessionInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the originating host tag.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Adds one initial attribute.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single server-side session.
///
/// Fields are private so the invariants hold no matter who holds a copy:
/// - `id` and `host` never change after construction.
/// - `last_access_time >= start_timestamp`, and no timestamp moves backwards.
/// - attributes and timeout only change while the session is `Active`.
///
/// Stores receive and return whole `Session` values; `Serialize` and
/// `Deserialize` let them persist it in whatever format they like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    start_timestamp: u64,
    last_access_time: u64,
    stop_timestamp: Option<u64>,
    timeout_override: Option<i64>,
    host: Option<String>,
    attributes: HashMap<String, Value>,
    state: SessionState,
}

impl Session {
    /// Creates an `Active` session that started (and was last used) at `now`.
    pub fn new(id: SessionId, now: u64, host: Option<String>) -> Self {
        Self {
            id,
            start_timestamp: now,
            last_access_time: now,
            stop_timestamp: None,
            timeout_override: None,
            host,
            attributes: HashMap::new(),
            state: SessionState::Active,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    pub fn last_access_time(&self) -> u64 {
        self.last_access_time
    }

    /// `None` until the session is stopped or expires.
    pub fn stop_timestamp(&self) -> Option<u64> {
        self.stop_timestamp
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The per-session timeout, if one was set with `set_timeout`.
    pub fn timeout_override(&self) -> Option<i64> {
        self.timeout_override
    }

    /// The timeout this session actually uses: its own override if set,
    /// otherwise `global_timeout_millis`.
    pub fn effective_timeout(&self, global_timeout_millis: i64) -> i64 {
        self.timeout_override.unwrap_or(global_timeout_millis)
    }

    /// Returns `true` if the session has been idle longer than its
    /// effective timeout at time `now`. A timeout `<= 0` never times out.
    pub fn is_timed_out(&self, now: u64, global_timeout_millis: i64) -> bool {
        let timeout = self.effective_timeout(global_timeout_millis);
        if timeout <= 0 {
            return false;
        }
        now.saturating_sub(self.last_access_time) > timeout as u64
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attribute_keys(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    // -- Mutators (manager-only) ------------------------------------------

    pub(crate) fn touch(&mut self, now: u64) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.last_access_time = self.last_access_time.max(now);
        Ok(())
    }

    pub(crate) fn set_attribute(
        &mut self,
        key: String,
        value: Value,
    ) -> Result<Option<Value>, SessionError> {
        self.ensure_active()?;
        Ok(self.attributes.insert(key, value))
    }

    pub(crate) fn remove_attribute(
        &mut self,
        key: &str,
    ) -> Result<Option<Value>, SessionError> {
        self.ensure_active()?;
        Ok(self.attributes.remove(key))
    }

    pub(crate) fn set_timeout(
        &mut self,
        millis: i64,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.timeout_override = Some(millis);
        Ok(())
    }

    pub(crate) fn stop(&mut self, now: u64) -> Result<(), SessionError> {
        self.terminate(SessionState::Stopped, now)
    }

    pub(crate) fn expire(&mut self, now: u64) -> Result<(), SessionError> {
        self.terminate(SessionState::Expired, now)
    }

    fn terminate(
        &mut self,
        state: SessionState,
        now: u64,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.state = state;
        self.stop_timestamp = Some(now.max(self.last_access_time));
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(SessionError::InvalidState {
                id: self.id.clone(),
                state: self.state,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(now: u64) -> Session {
        Session::new(SessionId::new("s1"), now, Some("10.0.0.1".into()))
    }

    #[test]
    fn test_new_session_is_active_with_equal_timestamps() {
        let s = session_at(1_000);
        assert_eq!(s.state(), SessionState::Active);
        assert_eq!(s.start_timestamp(), 1_000);
        assert_eq!(s.last_access_time(), 1_000);
        assert_eq!(s.stop_timestamp(), None);
        assert_eq!(s.host(), Some("10.0.0.1"));
    }

    #[test]
    fn test_touch_never_moves_last_access_backwards() {
        let mut s = session_at(1_000);
        s.touch(2_000).unwrap();
        s.touch(1_500).unwrap();
        assert_eq!(s.last_access_time(), 2_000);
        assert!(s.last_access_time() >= s.start_timestamp());
    }

    #[test]
    fn test_effective_timeout_prefers_override() {
        let mut s = session_at(0);
        assert_eq!(s.effective_timeout(500), 500);
        s.set_timeout(1).unwrap();
        assert_eq!(s.effective_timeout(500), 1);
    }

    #[test]
    fn test_is_timed_out_strictly_greater_than_timeout() {
        let s = session_at(0);
        assert!(!s.is_timed_out(100, 100), "exactly at the limit is alive");
        assert!(s.is_timed_out(101, 100));
    }

    #[test]
    fn test_is_timed_out_disabled_for_non_positive_timeout() {
        let s = session_at(0);
        assert!(!s.is_timed_out(u64::MAX, 0));
        assert!(!s.is_timed_out(u64::MAX, -1));
    }

    #[test]
    fn test_stop_sets_terminal_state_and_timestamp() {
        let mut s = session_at(1_000);
        s.stop(3_000).unwrap();
        assert_eq!(s.state(), SessionState::Stopped);
        assert_eq!(s.stop_timestamp(), Some(3_000));
    }

    #[test]
    fn test_terminal_session_rejects_every_mutation() {
        let mut s = session_at(0);
        s.expire(10).unwrap();

        assert!(matches!(s.touch(20), Err(SessionError::InvalidState { .. })));
        assert!(s.set_attribute("k".into(), Value::Bool(true)).is_err());
        assert!(s.remove_attribute("k").is_err());
        assert!(s.set_timeout(5).is_err());
        // Terminal states are never left, not even for the other terminal.
        assert!(s.stop(30).is_err());
        assert_eq!(s.state(), SessionState::Expired);
    }

    #[test]
    fn test_stop_timestamp_not_before_last_access() {
        let mut s = session_at(1_000);
        s.touch(5_000).unwrap();
        s.stop(4_000).unwrap();
        assert_eq!(s.stop_timestamp(), Some(5_000));
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut s = session_at(7);
        s.set_attribute("cart".into(), serde_json::json!([1, 2]))
            .unwrap();
        let bytes = serde_json::to_vec(&s).unwrap();
        let back: Session = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_session_config_partial_json_uses_defaults() {
        let cfg: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.global_timeout_millis, 1_800_000);
    }

    #[test]
    fn test_session_init_builder_collects_host_and_attributes() {
        let init = SessionInit::new()
            .with_host("kiosk-3")
            .with_attribute("locale", "en-GB");
        assert_eq!(init.host.as_deref(), Some("kiosk-3"));
        assert_eq!(init.attributes["locale"], Value::from("en-GB"));
    }
}
