//! Pluggable authentication for Keyward.
//!
//! Authentication answers one question: is the caller who they claim to be?
//!
//! 1. The caller builds an [`AuthenticationToken`] (principal + secret).
//! 2. The [`AuthenticationDispatcher`] picks the first registered
//!    [`CredentialVerificationModule`] that supports the token's kind.
//! 3. The module looks the account up, checks its flags, and compares
//!    credentials through a [`CredentialMatcher`].
//! 4. On success the dispatcher returns an [`Identity`](keyward_types::Identity)
//!    carrying the account's roles and permissions.
//!
//! Keyward ships no directory or database integration. Implement
//! [`IdentityStore`] (for [`StoreBackedModule`]) or a whole
//! [`CredentialVerificationModule`] for your backend.

mod dispatcher;
mod error;
mod info;
mod matcher;
mod module;
mod token;

pub use dispatcher::AuthenticationDispatcher;
pub use error::{AuthenticationError, IdentityStoreError};
pub use info::AuthenticationInfo;
pub use matcher::{
    ConstantTimeMatcher, CredentialHasher, CredentialMatcher, HashEncoding,
    HashedCredentialMatcher,
};
pub use module::{
    CredentialVerificationModule, IdentityStore, MemoryIdentityStore,
    StoreBackedModule,
};
pub use token::{AuthenticationToken, Credentials, TokenKind};
