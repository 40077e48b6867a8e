//! What a caller submits to log in.
//!
//! An [`AuthenticationToken`] pairs a principal with secret credential
//! bytes and a [`TokenKind`] that modules use to decide whether they can
//! handle it. The credential bytes live in a [`Credentials`] buffer that is
//! zeroed when cleared and again when dropped, so a password doesn't linger
//! in freed memory after the login call is done with it.

use std::borrow::Cow;
use std::fmt;

use keyward_types::Principal;
use zeroize::{Zeroize, Zeroizing};

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// Tag identifying the shape of a token ("username_password", "api_key",
/// "x509", ...). Modules advertise the kinds they support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKind(Cow<'static, str>);

impl TokenKind {
    /// A username and password pair.
    pub const USERNAME_PASSWORD: TokenKind =
        TokenKind(Cow::Borrowed("username_password"));

    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Secret credential bytes (a password, an API key, a hash).
///
/// `Debug` never prints the bytes. [`clear`](Self::clear) zeroes them on
/// demand; `Drop` zeroes them regardless.
#[derive(Clone)]
pub struct Credentials(Zeroizing<Vec<u8>>);

impl Credentials {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Borrow the raw bytes. Avoid copying them anywhere that isn't zeroed.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites every byte with zero and empties the buffer.
    pub fn clear(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(<{} bytes redacted>)", self.len())
    }
}

impl From<&str> for Credentials {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credentials {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Vec<u8>> for Credentials {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

// ---------------------------------------------------------------------------
// AuthenticationToken
// ---------------------------------------------------------------------------

/// A principal plus the credentials proving it, submitted for login.
///
/// ```rust
/// use keyward_authc::{AuthenticationToken, TokenKind};
///
/// let mut token = AuthenticationToken::username_password("alice", "s3cret");
/// assert_eq!(token.kind(), &TokenKind::USERNAME_PASSWORD);
///
/// token.clear();
/// assert!(token.is_cleared());
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticationToken {
    kind: TokenKind,
    principal: Principal,
    credentials: Credentials,
}

impl AuthenticationToken {
    pub fn new(
        kind: TokenKind,
        principal: Principal,
        credentials: Credentials,
    ) -> Self {
        Self {
            kind,
            principal,
            credentials,
        }
    }

    /// The common username/password token.
    pub fn username_password(
        username: impl Into<String>,
        password: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(
            TokenKind::USERNAME_PASSWORD,
            Principal::new(username),
            Credentials::new(password),
        )
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Zeroes the credential bytes. The kind and principal stay readable.
    pub fn clear(&mut self) {
        self.credentials.clear();
    }

    pub fn is_cleared(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_empties_credentials_but_keeps_principal() {
        let mut token = AuthenticationToken::username_password("alice", "pw");
        assert_eq!(token.credentials().expose(), b"pw");

        token.clear();

        assert!(token.is_cleared());
        assert_eq!(token.credentials().len(), 0);
        assert_eq!(token.principal().as_str(), "alice");
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let token = AuthenticationToken::username_password("alice", "hunter2");
        let printed = format!("{token:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("7 bytes redacted"));
    }

    #[test]
    fn test_token_kind_const_equals_owned() {
        assert_eq!(
            TokenKind::USERNAME_PASSWORD,
            TokenKind::new("username_password")
        );
        assert_eq!(TokenKind::new("api_key").to_string(), "api_key");
    }
}
