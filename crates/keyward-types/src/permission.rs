//! Permissions and the actions they are checked against.
//!
//! Keyward does not define a permission grammar. A permission is any value
//! that can answer one question: "does holding me imply holding that?"
//! Wildcard strings, ACL entries, and capability tokens all fit behind the
//! [`Permission`] trait. [`NamedPermission`] is the simplest implementation:
//! two permissions are related only if their names are identical.

use std::fmt;
use std::sync::Arc;

use crate::RoleId;

/// An opaque permission capability.
///
/// # Trait bounds
///
/// - `Debug` so identities holding permissions can be logged.
/// - `Send + Sync` because identities are shared across request threads.
pub trait Permission: fmt::Debug + Send + Sync {
    /// Returns `true` if holding `self` also grants `other`.
    fn implies(&self, other: &dyn Permission) -> bool;

    /// A human-readable name, used in logs and by [`NamedPermission`].
    fn name(&self) -> &str;
}

/// A permission that implies only another permission with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedPermission(String);

impl NamedPermission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Convenience for building the `Arc<dyn Permission>` that identities
    /// and actions carry.
    pub fn shared(name: impl Into<String>) -> Arc<dyn Permission> {
        Arc::new(Self::new(name))
    }
}

impl Permission for NamedPermission {
    fn implies(&self, other: &dyn Permission) -> bool {
        self.0 == other.name()
    }

    fn name(&self) -> &str {
        &self.0
    }
}

/// Something a caller asks to do, as seen by the authorization engine.
///
/// ```rust
/// use keyward_types::{Action, NamedPermission, RoleId};
///
/// let read = Action::Permission(NamedPermission::shared("report:read"));
/// let admin = Action::Role(RoleId::new("admin"));
/// assert_eq!(read.to_string(), "permission report:read");
/// assert_eq!(admin.to_string(), "role admin");
/// ```
#[derive(Debug, Clone)]
pub enum Action {
    /// The caller must hold this role.
    Role(RoleId),

    /// The caller must hold a permission that implies this one.
    Permission(Arc<dyn Permission>),
}

impl Action {
    /// Shorthand for `Action::Permission(NamedPermission::shared(name))`.
    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission(NamedPermission::shared(name))
    }

    /// Shorthand for `Action::Role(RoleId::new(name))`.
    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(RoleId::new(name))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "role {role}"),
            Self::Permission(p) => write!(f, "permission {}", p.name()),
        }
    }
}
