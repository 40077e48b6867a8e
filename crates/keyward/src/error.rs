//! Unified error type for the Keyward facade.

use keyward_authc::AuthenticationError;
use keyward_session::{SessionError, StoreError};

/// Top-level error that wraps the layer-specific errors.
///
/// Through the facade you deal with this single type; `#[from]` lets `?`
/// convert the layer errors automatically. Authorization has no variant: a
/// denied action is `Ok(false)`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum KeywardError {
    /// Login failed (unknown account, bad credentials, ...).
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// A session operation failed (not found, expired, store failure).
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<StoreError> for KeywardError {
    fn from(err: StoreError) -> Self {
        Self::Session(SessionError::Storage(err))
    }
}

impl KeywardError {
    /// `true` if the session is gone: never existed, stopped, or expired.
    /// Callers typically answer this by sending the user back to login.
    pub fn is_session_gone(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::NotFound(_) | SessionError::Expired(_))
        )
    }
}
