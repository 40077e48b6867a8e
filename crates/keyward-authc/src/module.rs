//! Credential verification modules and the identity stores behind them.
//!
//! A [`CredentialVerificationModule`] is one source of identity truth: an
//! LDAP directory, a user table, an API key list. It declares which
//! [`TokenKind`]s it understands and turns a token into verified
//! [`AuthenticationInfo`], or fails with the reason.
//!
//! [`StoreBackedModule`] is the stock module: it fetches account data from
//! an [`IdentityStore`] and checks it in a fixed order.
//!
//! ```text
//! lookup ──none──→ UnknownAccount
//!   │
//!   ├── locked ──→ LockedAccount
//!   ├── expired ─→ ExpiredCredential
//!   ├── mismatch → IncorrectCredential
//!   ▼
//! AuthenticationInfo
//! ```

use std::collections::HashMap;

use keyward_types::Principal;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    AuthenticationError, AuthenticationInfo, AuthenticationToken,
    ConstantTimeMatcher, CredentialMatcher, IdentityStoreError, TokenKind,
};

/// A pluggable authenticator for one or more token kinds.
///
/// Modules are stateless per call and may be invoked in parallel, hence
/// `Send + Sync`.
pub trait CredentialVerificationModule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this module can authenticate tokens of `kind`.
    fn supports(&self, kind: &TokenKind) -> bool;

    /// Verifies the token and returns the account's data.
    ///
    /// Only called for tokens whose kind this module `supports`. The token
    /// is borrowed; a module must not keep any copy of its credentials.
    fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<AuthenticationInfo, AuthenticationError>;
}

// ---------------------------------------------------------------------------
// Identity stores
// ---------------------------------------------------------------------------

/// Backing store of account data, keyed by principal.
pub trait IdentityStore: Send + Sync {
    /// `Ok(None)` means the account doesn't exist. `Err` is a backend
    /// failure and surfaces as [`AuthenticationError::IdentityStore`].
    fn account_info(
        &self,
        principal: &Principal,
    ) -> Result<Option<AuthenticationInfo>, IdentityStoreError>;
}

/// In-process [`IdentityStore`] for tests and small deployments.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    accounts: RwLock<HashMap<Principal, AuthenticationInfo>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the account for `info.principal`.
    pub fn insert(&self, info: AuthenticationInfo) {
        self.accounts.write().insert(info.principal.clone(), info);
    }

    pub fn remove(&self, principal: &Principal) -> bool {
        self.accounts.write().remove(principal).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn account_info(
        &self,
        principal: &Principal,
    ) -> Result<Option<AuthenticationInfo>, IdentityStoreError> {
        Ok(self.accounts.read().get(principal).cloned())
    }
}

// ---------------------------------------------------------------------------
// StoreBackedModule
// ---------------------------------------------------------------------------

/// Authenticates against an [`IdentityStore`] using a [`CredentialMatcher`].
///
/// Supports [`TokenKind::USERNAME_PASSWORD`] by default; use
/// [`with_kinds`](Self::with_kinds) for anything else that carries a
/// principal and a secret.
pub struct StoreBackedModule<I, M = ConstantTimeMatcher> {
    name: String,
    store: I,
    matcher: M,
    kinds: Vec<TokenKind>,
}

impl<I: IdentityStore> StoreBackedModule<I, ConstantTimeMatcher> {
    /// A module comparing plain stored secrets in constant time.
    pub fn new(store: I) -> Self {
        Self::with_matcher(store, ConstantTimeMatcher)
    }
}

impl<I: IdentityStore, M: CredentialMatcher> StoreBackedModule<I, M> {
    pub fn with_matcher(store: I, matcher: M) -> Self {
        Self {
            name: "store".to_string(),
            store,
            matcher,
            kinds: vec![TokenKind::USERNAME_PASSWORD],
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the supported token kinds.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = TokenKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn store(&self) -> &I {
        &self.store
    }
}

impl<I: IdentityStore, M: CredentialMatcher> CredentialVerificationModule
    for StoreBackedModule<I, M>
{
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, kind: &TokenKind) -> bool {
        self.kinds.contains(kind)
    }

    fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        let principal = token.principal();

        let info = self
            .store
            .account_info(principal)
            .map_err(|source| AuthenticationError::IdentityStore {
                principal: principal.clone(),
                source,
            })?
            .ok_or_else(|| AuthenticationError::UnknownAccount(principal.clone()))?;

        if info.account_locked {
            return Err(AuthenticationError::LockedAccount(principal.clone()));
        }
        if info.credentials_expired {
            return Err(AuthenticationError::ExpiredCredential(principal.clone()));
        }
        if !self.matcher.matches(token.credentials(), &info.credentials) {
            return Err(AuthenticationError::IncorrectCredential(principal.clone()));
        }

        debug!(module = %self.name, %principal, "credentials verified");
        Ok(info)
    }
}

impl<I, M> std::fmt::Debug for StoreBackedModule<I, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBackedModule")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}
