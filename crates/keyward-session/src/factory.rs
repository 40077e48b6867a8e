//! Pluggable session creation.
//!
//! [`SessionManager::start`](crate::SessionManager::start) asks a
//! [`SessionFactory`] for the new record, then seeds attributes, persists it
//! and notifies listeners. The factory decides the id scheme and whether a
//! host is mandatory; everything after creation stays with the manager.

use keyward_types::SessionId;
use rand::Rng;

use crate::{Session, SessionError};

/// Builds the record for a session that is about to start.
///
/// Implementations must return an `Active` session whose start and last
/// access timestamps are both `now_millis`; [`Session::new`] does exactly
/// that. Returning an error aborts `start` before anything is stored.
pub trait SessionFactory: Send + Sync + 'static {
    fn create(
        &self,
        host: Option<String>,
        now_millis: u64,
    ) -> Result<Session, SessionError>;
}

impl<F> SessionFactory for F
where
    F: Fn(Option<String>, u64) -> Result<Session, SessionError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        host: Option<String>,
        now_millis: u64,
    ) -> Result<Session, SessionError> {
        self(host, now_millis)
    }
}

/// The default factory: 128-bit random hex ids.
///
/// Session ids are bearer secrets, so they must be unguessable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdFactory {
    require_host: bool,
}

impl RandomIdFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses to start sessions that carry no originating host.
    pub fn requiring_host(mut self) -> Self {
        self.require_host = true;
        self
    }

    pub fn requires_host(&self) -> bool {
        self.require_host
    }
}

impl SessionFactory for RandomIdFactory {
    fn create(
        &self,
        host: Option<String>,
        now_millis: u64,
    ) -> Result<Session, SessionError> {
        if self.require_host && host.is_none() {
            return Err(SessionError::HostRequired);
        }
        Ok(Session::new(random_session_id(), now_millis, host))
    }
}

fn random_session_id() -> SessionId {
    let bytes: [u8; 16] = rand::rng().random();
    SessionId::new(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionState;

    #[test]
    fn test_random_factory_ids_are_32_hex_chars() {
        let session = RandomIdFactory::new().create(None, 7).unwrap();

        let id = session.id().as_str();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.start_timestamp(), 7);
        assert_eq!(session.last_access_time(), 7);
    }

    #[test]
    fn test_random_factory_requiring_host_rejects_none() {
        let factory = RandomIdFactory::new().requiring_host();

        assert!(matches!(
            factory.create(None, 0),
            Err(SessionError::HostRequired)
        ));
        let session = factory.create(Some("10.0.0.9".into()), 0).unwrap();
        assert_eq!(session.host(), Some("10.0.0.9"));
    }

    #[test]
    fn test_closure_is_a_factory() {
        let factory = |host: Option<String>, now: u64| {
            Ok::<_, SessionError>(Session::new(SessionId::new("fixed"), now, host))
        };

        let session = factory.create(None, 3).unwrap();

        assert_eq!(session.id().as_str(), "fixed");
    }
}
