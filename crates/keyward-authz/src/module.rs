//! Authorization modules: the voters.
//!
//! Each module looks at one `(identity, action)` pair and answers
//! [`Vote::Grant`], [`Vote::Deny`], or [`Vote::Abstain`] when the question
//! isn't its business. Modules never see each other's votes.

use keyward_types::{Action, Identity, Vote};

/// A single voter in the authorization engine.
///
/// Any `Fn(&Identity, &Action) -> Vote` closure is a module too:
///
/// ```rust
/// use keyward_authz::AuthorizationModule;
/// use keyward_types::{Action, Identity, Principal, Vote};
///
/// let deny_guests = |identity: &Identity, _action: &Action| {
///     if identity.principal().as_str() == "guest" {
///         Vote::Deny
///     } else {
///         Vote::Abstain
///     }
/// };
///
/// let guest = Identity::anonymous(Principal::new("guest"));
/// assert_eq!(deny_guests.vote(&guest, &Action::permission("x")), Vote::Deny);
/// ```
pub trait AuthorizationModule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    fn vote(&self, identity: &Identity, action: &Action) -> Vote;
}

impl<F> AuthorizationModule for F
where
    F: Fn(&Identity, &Action) -> Vote + Send + Sync,
{
    fn vote(&self, identity: &Identity, action: &Action) -> Vote {
        self(identity, action)
    }
}

/// Grants role checks for roles the identity holds; abstains on everything
/// else, including permission checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleModule;

impl AuthorizationModule for RoleModule {
    fn name(&self) -> &str {
        "roles"
    }

    fn vote(&self, identity: &Identity, action: &Action) -> Vote {
        match action {
            Action::Role(role) if identity.has_role(role) => Vote::Grant,
            _ => Vote::Abstain,
        }
    }
}

/// Grants permission checks implied by one of the identity's granted
/// permissions; abstains otherwise.
///
/// Never denies. A missing permission is "not my grant to give", and the
/// fail-closed default strategy turns an all-abstain result into a denial
/// anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionModule;

impl AuthorizationModule for PermissionModule {
    fn name(&self) -> &str {
        "permissions"
    }

    fn vote(&self, identity: &Identity, action: &Action) -> Vote {
        match action {
            Action::Permission(required) if identity.implies(required.as_ref()) => {
                Vote::Grant
            }
            _ => Vote::Abstain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_types::{NamedPermission, Principal, RoleId};

    fn editor() -> Identity {
        Identity::new(
            Principal::new("ed"),
            [RoleId::new("editor")].into_iter().collect(),
            vec![NamedPermission::shared("article:write")],
        )
    }

    #[test]
    fn test_role_module_grants_held_role() {
        assert_eq!(RoleModule.vote(&editor(), &Action::role("editor")), Vote::Grant);
        assert_eq!(RoleModule.vote(&editor(), &Action::role("admin")), Vote::Abstain);
    }

    #[test]
    fn test_role_module_abstains_on_permissions() {
        let action = Action::permission("article:write");
        assert_eq!(RoleModule.vote(&editor(), &action), Vote::Abstain);
    }

    #[test]
    fn test_permission_module_grants_implied_permission() {
        let granted = Action::permission("article:write");
        let other = Action::permission("article:delete");
        assert_eq!(PermissionModule.vote(&editor(), &granted), Vote::Grant);
        assert_eq!(PermissionModule.vote(&editor(), &other), Vote::Abstain);
        assert_eq!(
            PermissionModule.vote(&editor(), &Action::role("editor")),
            Vote::Abstain
        );
    }

    #[test]
    fn test_closure_module_has_default_name() {
        let always = |_: &Identity, _: &Action| Vote::Grant;
        assert_eq!(AuthorizationModule::name(&always), "custom");
    }
}
