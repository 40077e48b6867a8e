//! The verified identity produced by authentication.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{Permission, Principal, RoleId};

/// Who a caller is, and what they were granted, after a successful login.
///
/// Built by the authentication dispatcher from the account data a
/// verification module looked up. Request-scoped: it is never persisted and
/// has no identity across calls beyond the principal it names.
///
/// `Clone` is cheap: permissions are shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct Identity {
    principal: Principal,
    roles: BTreeSet<RoleId>,
    permissions: Vec<Arc<dyn Permission>>,
}

impl Identity {
    pub fn new(
        principal: Principal,
        roles: BTreeSet<RoleId>,
        permissions: Vec<Arc<dyn Permission>>,
    ) -> Self {
        Self {
            principal,
            roles,
            permissions,
        }
    }

    /// An identity with no roles and no permissions. Handy in tests and for
    /// anonymous callers.
    pub fn anonymous(principal: Principal) -> Self {
        Self::new(principal, BTreeSet::new(), Vec::new())
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn roles(&self) -> &BTreeSet<RoleId> {
        &self.roles
    }

    pub fn permissions(&self) -> &[Arc<dyn Permission>] {
        &self.permissions
    }

    /// Returns `true` if the role was granted.
    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }

    /// Returns `true` if any granted permission implies `required`.
    pub fn implies(&self, required: &dyn Permission) -> bool {
        self.permissions.iter().any(|p| p.implies(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NamedPermission;

    fn alice() -> Identity {
        Identity::new(
            Principal::new("alice"),
            [RoleId::new("admin")].into_iter().collect(),
            vec![NamedPermission::shared("doc:read")],
        )
    }

    #[test]
    fn test_has_role_granted_returns_true() {
        assert!(alice().has_role(&RoleId::new("admin")));
        assert!(!alice().has_role(&RoleId::new("auditor")));
    }

    #[test]
    fn test_implies_checks_every_granted_permission() {
        let id = alice();
        assert!(id.implies(&NamedPermission::new("doc:read")));
        assert!(!id.implies(&NamedPermission::new("doc:write")));
    }

    #[test]
    fn test_anonymous_has_nothing() {
        let id = Identity::anonymous(Principal::new("guest"));
        assert!(id.roles().is_empty());
        assert!(id.permissions().is_empty());
        assert_eq!(id.principal().as_str(), "guest");
    }
}
