//! # Keyward
//!
//! Embeddable security engine: pluggable authentication, vote-based
//! authorization, and server-side sessions with idle expiration. Transport
//! agnostic; the host decides how tokens and session ids travel.
//!
//! | Layer | Crate |
//! |-------|-------|
//! | Shared ids, identity, permissions, votes | `keyward-types` |
//! | Session lifecycle, stores, listeners | `keyward-session` |
//! | Background expiration sweep | `keyward-validation` |
//! | Authentication modules and dispatcher | `keyward-authc` |
//! | Authorization voting engine | `keyward-authz` |
//!
//! This crate re-exports all of them and adds [`SecurityManager`], which
//! wires them together.
//!
//! ## Quick Start
//!
//! ```rust
//! use keyward::prelude::*;
//!
//! let users = MemoryIdentityStore::new();
//! users.insert(
//!     AuthenticationInfo::new(Principal::new("ann"), "pw".into())
//!         .with_permission(NamedPermission::shared("report:read")),
//! );
//!
//! let security = SecurityManagerBuilder::new()
//!     .authentication_module(StoreBackedModule::new(users))
//!     .authorization_module(PermissionModule)
//!     .build(MemorySessionStore::new());
//!
//! let login = security
//!     .login(AuthenticationToken::username_password("ann", "pw"), Some("10.0.0.7"))
//!     .unwrap();
//! let read = Action::permission("report:read");
//! assert!(security.is_permitted(&login.session_id, &login.identity, &read).unwrap());
//! security.logout(&login.session_id).unwrap();
//! ```

mod config;
mod error;
mod security;

pub use config::SecurityConfig;
pub use error::KeywardError;
pub use security::{LoginOutcome, PRINCIPAL_ATTRIBUTE, SecurityManager, SecurityManagerBuilder};

pub use keyward_authc as authc;
pub use keyward_authz as authz;
pub use keyward_session as session;
pub use keyward_types as types;
pub use keyward_validation as validation;

/// Everything a typical embedding needs, in one import.
pub mod prelude {
    pub use crate::{
        KeywardError, LoginOutcome, SecurityConfig, SecurityManager,
        SecurityManagerBuilder,
    };
    pub use keyward_authc::{
        AuthenticationDispatcher, AuthenticationError, AuthenticationInfo,
        AuthenticationToken, ConstantTimeMatcher, CredentialVerificationModule,
        Credentials, HashEncoding, HashedCredentialMatcher, IdentityStore,
        IdentityStoreError, MemoryIdentityStore, StoreBackedModule, TokenKind,
    };
    pub use keyward_authz::{
        AuthorizationEngine, AuthorizationModule, MajorityStrategy,
        PermissionModule, RoleModule, UnanimousStrategy, VetoStrategy,
        VoteStrategy,
    };
    pub use keyward_session::{
        Clock, ManualClock, MemorySessionStore, RandomIdFactory, Session,
        SessionConfig, SessionError, SessionFactory, SessionListener,
        SessionManager, SessionStore, SystemClock,
    };
    pub use keyward_types::{
        Action, Identity, NamedPermission, Permission, Principal, RoleId,
        SessionId, Vote,
    };
    pub use keyward_validation::{SweepMetrics, ValidationConfig};
}
