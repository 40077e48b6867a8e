//! Error types for the authentication layer.

use keyward_types::Principal;

use crate::TokenKind;

/// Why an authentication attempt failed.
///
/// Every failure is terminal for that call; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// No registered module accepts this kind of token.
    #[error("no authentication module supports {0} tokens")]
    UnsupportedToken(TokenKind),

    /// The identity store has no account for the principal.
    #[error("no account found for {0}")]
    UnknownAccount(Principal),

    /// The account exists but is locked.
    #[error("account {0} is locked")]
    LockedAccount(Principal),

    /// The account's stored credentials have expired and must be renewed.
    #[error("credentials for {0} have expired")]
    ExpiredCredential(Principal),

    /// The submitted credentials didn't match the stored ones.
    #[error("credentials for {0} did not match")]
    IncorrectCredential(Principal),

    /// The backing identity store failed while looking up the account.
    #[error("identity lookup for {principal} failed: {source}")]
    IdentityStore {
        principal: Principal,
        #[source]
        source: IdentityStoreError,
    },
}

/// Errors reported by an [`IdentityStore`](crate::IdentityStore).
#[derive(Debug, thiserror::Error)]
pub enum IdentityStoreError {
    /// The backend could not be reached (connection refused, timeout).
    #[error("identity store unavailable: {0}")]
    Unavailable(String),

    /// The account exists but its stored record could not be decoded.
    #[error("account record is malformed: {0}")]
    Malformed(String),

    /// Any other backend failure.
    #[error("identity store failure: {0}")]
    Backend(String),
}

impl AuthenticationError {
    /// The principal the failure is about, if the attempt got that far.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::UnsupportedToken(_) => None,
            Self::UnknownAccount(p)
            | Self::LockedAccount(p)
            | Self::ExpiredCredential(p)
            | Self::IncorrectCredential(p) => Some(p),
            Self::IdentityStore { principal, .. } => Some(principal),
        }
    }
}
