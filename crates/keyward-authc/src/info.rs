//! Account data a verification module looks up for a principal.

use std::collections::BTreeSet;
use std::sync::Arc;

use keyward_types::{Identity, Permission, Principal, RoleId};

use crate::Credentials;

/// Everything an identity store knows about one account.
///
/// Request-scoped: modules build or fetch it per attempt and drop it when
/// the attempt is over. The stored credentials are zeroed on drop like any
/// other [`Credentials`].
#[derive(Debug, Clone)]
pub struct AuthenticationInfo {
    pub principal: Principal,
    /// What the submitted credentials are checked against (plain secret or
    /// a hash, depending on the matcher in use).
    pub credentials: Credentials,
    pub roles: BTreeSet<RoleId>,
    pub permissions: Vec<Arc<dyn Permission>>,
    pub account_locked: bool,
    pub credentials_expired: bool,
}

impl AuthenticationInfo {
    /// An unlocked, unexpired account with no grants.
    pub fn new(principal: Principal, credentials: Credentials) -> Self {
        Self {
            principal,
            credentials,
            roles: BTreeSet::new(),
            permissions: Vec::new(),
            account_locked: false,
            credentials_expired: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(RoleId::new(role));
        self
    }

    pub fn with_permission(mut self, permission: Arc<dyn Permission>) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn locked(mut self) -> Self {
        self.account_locked = true;
        self
    }

    pub fn expired(mut self) -> Self {
        self.credentials_expired = true;
        self
    }

    /// The identity a successful login yields: principal and grants, never
    /// the credentials.
    pub fn to_identity(&self) -> Identity {
        Identity::new(
            self.principal.clone(),
            self.roles.clone(),
            self.permissions.clone(),
        )
    }
}
