//! The authorization engine: polls every module, applies the strategy.

use keyward_types::{Action, Identity, Vote};
use tracing::debug;

use crate::{AuthorizationModule, Ballot, VetoStrategy, VoteStrategy, VoteTally};

/// Decides whether an identity may perform an action.
///
/// Authorization is a boolean decision, never an error: callers must branch
/// on the result. With no modules registered every action is denied under
/// every stock strategy.
///
/// ```rust
/// use keyward_authz::{AuthorizationEngine, PermissionModule};
/// use keyward_types::{Action, Identity, NamedPermission, Principal};
///
/// let engine = AuthorizationEngine::new().with_module(PermissionModule);
/// let reader = Identity::new(
///     Principal::new("rita"),
///     Default::default(),
///     vec![NamedPermission::shared("report:read")],
/// );
///
/// assert!(engine.is_authorized(&reader, &Action::permission("report:read")));
/// assert!(!engine.is_authorized(&reader, &Action::permission("report:delete")));
/// ```
pub struct AuthorizationEngine {
    modules: Vec<Box<dyn AuthorizationModule>>,
    strategy: Box<dyn VoteStrategy>,
}

impl Default for AuthorizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationEngine {
    /// An engine with no modules and the fail-closed [`VetoStrategy`].
    pub fn new() -> Self {
        Self::with_strategy(VetoStrategy)
    }

    pub fn with_strategy(strategy: impl VoteStrategy + 'static) -> Self {
        Self::with_boxed_strategy(Box::new(strategy))
    }

    pub fn with_boxed_strategy(strategy: Box<dyn VoteStrategy>) -> Self {
        Self {
            modules: Vec::new(),
            strategy,
        }
    }

    /// Appends a module (builder style).
    pub fn with_module(mut self, module: impl AuthorizationModule + 'static) -> Self {
        self.add_module(Box::new(module));
        self
    }

    pub fn add_module(&mut self, module: Box<dyn AuthorizationModule>) {
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn strategy(&self) -> &dyn VoteStrategy {
        self.strategy.as_ref()
    }

    /// Every module's vote, in registration order.
    pub fn votes(&self, identity: &Identity, action: &Action) -> Vec<Vote> {
        self.ballots(identity, action)
            .into_iter()
            .map(|b| b.vote)
            .collect()
    }

    /// Every module's vote with the module's name, in registration order.
    pub fn ballots(&self, identity: &Identity, action: &Action) -> Vec<Ballot<'_>> {
        self.modules
            .iter()
            .map(|m| Ballot::new(m.name(), m.vote(identity, action)))
            .collect()
    }

    /// `true` if the strategy authorizes `action` for `identity`.
    pub fn is_authorized(&self, identity: &Identity, action: &Action) -> bool {
        let ballots = self.ballots(identity, action);
        let allowed = self.strategy.decide(identity, action, &ballots);

        debug!(
            principal = %identity.principal(),
            %action,
            strategy = self.strategy.name(),
            tally = %VoteTally::of_ballots(&ballots),
            allowed,
            "authorization decided"
        );
        allowed
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        f.debug_struct("AuthorizationEngine")
            .field("modules", &names)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
