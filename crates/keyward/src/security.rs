//! `SecurityManager` builder and facade.
//!
//! This is the entry point most applications use. It ties the three layers
//! together: authenticate a token, bind the resulting identity to a fresh
//! session, and later check actions against that identity while keeping the
//! session alive.

use std::sync::Arc;

use keyward_authc::{
    AuthenticationDispatcher, AuthenticationToken, CredentialVerificationModule,
};
use keyward_authz::{AuthorizationEngine, AuthorizationModule, VetoStrategy, VoteStrategy};
use keyward_session::{
    Clock, ListenerId, RandomIdFactory, SessionFactory, SessionInit,
    SessionListener, SessionManager, SessionStore, SystemClock,
};
use keyward_types::{Action, Identity, Principal, SessionId};
use keyward_validation::{SweepMetrics, ValidationScheduler};
use tokio::sync::Mutex;

use crate::{KeywardError, SecurityConfig};

/// Session attribute under which `login` records the authenticated
/// principal.
pub const PRINCIPAL_ATTRIBUTE: &str = "keyward.principal";

/// What a successful [`SecurityManager::login`] hands back.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The new session; give this to the client.
    pub session_id: SessionId,
    /// Who logged in and what they were granted. Keep it server-side for
    /// the session's lifetime.
    pub identity: Identity,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`SecurityManager`].
///
/// # Example
///
/// ```rust
/// use keyward::prelude::*;
///
/// let users = MemoryIdentityStore::new();
/// users.insert(AuthenticationInfo::new(Principal::new("ann"), "pw".into()));
///
/// let security = SecurityManagerBuilder::new()
///     .authentication_module(StoreBackedModule::new(users))
///     .authorization_module(RoleModule)
///     .build(MemorySessionStore::new());
///
/// let login = security
///     .login(AuthenticationToken::username_password("ann", "pw"), None)
///     .unwrap();
/// assert!(security.sessions().is_valid(&login.session_id).unwrap());
/// ```
pub struct SecurityManagerBuilder {
    config: SecurityConfig,
    clock: Arc<dyn Clock>,
    factory: Arc<dyn SessionFactory>,
    authenticator: AuthenticationDispatcher,
    authorization_modules: Vec<Box<dyn AuthorizationModule>>,
    strategy: Box<dyn VoteStrategy>,
    listeners: Vec<Arc<dyn SessionListener>>,
}

impl SecurityManagerBuilder {
    /// Default config, system clock, no modules, veto strategy.
    pub fn new() -> Self {
        Self {
            config: SecurityConfig::default(),
            clock: Arc::new(SystemClock),
            factory: Arc::new(RandomIdFactory::new()),
            authenticator: AuthenticationDispatcher::new(),
            authorization_modules: Vec::new(),
            strategy: Box::new(VetoStrategy),
            listeners: Vec::new(),
        }
    }

    pub fn config(mut self, config: SecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the time source (tests pass a `ManualClock`).
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces how new sessions are created (id scheme, host policy).
    pub fn session_factory(mut self, factory: impl SessionFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Appends an authentication module; first supporting module wins.
    pub fn authentication_module(
        mut self,
        module: impl CredentialVerificationModule + 'static,
    ) -> Self {
        self.authenticator.add_module(Box::new(module));
        self
    }

    /// Appends an authorization voter.
    pub fn authorization_module(
        mut self,
        module: impl AuthorizationModule + 'static,
    ) -> Self {
        self.authorization_modules.push(Box::new(module));
        self
    }

    /// Replaces the vote aggregation strategy.
    pub fn strategy(mut self, strategy: impl VoteStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Registers a session listener before any session exists.
    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Assembles the manager over `store`. Validation is not started; call
    /// [`SecurityManager::start_validation`] from inside a tokio runtime.
    pub fn build<S: SessionStore>(self, store: S) -> SecurityManager<S> {
        let sessions = Arc::new(
            SessionManager::with_clock(
                store,
                self.config.session.clone(),
                self.clock,
            )
            .with_factory(self.factory),
        );
        for listener in self.listeners {
            sessions.add_listener(listener);
        }

        let mut authorizer = AuthorizationEngine::with_boxed_strategy(self.strategy);
        for module in self.authorization_modules {
            authorizer.add_module(module);
        }

        let validation =
            ValidationScheduler::new(Arc::clone(&sessions), self.config.validation);

        tracing::debug!(
            authentication_modules = self.authenticator.len(),
            authorization_modules = authorizer.len(),
            strategy = authorizer.strategy().name(),
            "security manager built"
        );

        SecurityManager {
            sessions,
            authenticator: self.authenticator,
            authorizer,
            validation: Mutex::new(validation),
        }
    }
}

impl Default for SecurityManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SecurityManager
// ---------------------------------------------------------------------------

/// Authentication, authorization, and sessions behind one handle.
///
/// All request-path methods take `&self`, so the manager can sit in an
/// `Arc` shared by every request handler.
pub struct SecurityManager<S: SessionStore> {
    sessions: Arc<SessionManager<S>>,
    authenticator: AuthenticationDispatcher,
    authorizer: AuthorizationEngine,
    /// Async mutex: `stop_validation` awaits the sweep task while holding it.
    validation: Mutex<ValidationScheduler<S>>,
}

impl<S: SessionStore> SecurityManager<S> {
    /// Authenticates `token` and starts a session for the identity.
    ///
    /// The token is consumed and its credentials zeroed before this returns,
    /// whether the login succeeds or not. The session records the principal
    /// under [`PRINCIPAL_ATTRIBUTE`].
    ///
    /// # Errors
    /// - [`KeywardError::Authentication`] if the token is rejected
    /// - [`KeywardError::Session`] if the session can't be stored
    pub fn login(
        &self,
        mut token: AuthenticationToken,
        host: Option<&str>,
    ) -> Result<LoginOutcome, KeywardError> {
        let result = self.authenticator.authenticate(&token);
        token.clear();
        let identity = result?;

        let mut init = SessionInit::new()
            .with_attribute(PRINCIPAL_ATTRIBUTE, identity.principal().as_str());
        if let Some(host) = host {
            init = init.with_host(host);
        }
        let session_id = self.sessions.start(init)?;

        tracing::info!(
            principal = %identity.principal(),
            session_id = %session_id,
            "login succeeded"
        );
        Ok(LoginOutcome {
            session_id,
            identity,
        })
    }

    /// Checks whether `identity` may perform `action` within a live session.
    ///
    /// The session is touched first, so a stale session fails with
    /// `Expired` before any vote is cast, and a live one has its idle clock
    /// reset. A denied action is `Ok(false)`.
    pub fn is_permitted(
        &self,
        session_id: &SessionId,
        identity: &Identity,
        action: &Action,
    ) -> Result<bool, KeywardError> {
        self.sessions.touch(session_id)?;
        Ok(self.authorizer.is_authorized(identity, action))
    }

    /// The principal recorded on the session at login, if any.
    pub fn session_principal(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Principal>, KeywardError> {
        let value = self.sessions.get_attribute(session_id, PRINCIPAL_ATTRIBUTE)?;
        Ok(value.and_then(|v| v.as_str().map(Principal::new)))
    }

    /// Ends the session.
    ///
    /// Logging out twice fires `on_stop` once; the second call reports the
    /// session as gone (see [`KeywardError::is_session_gone`]), as does
    /// logging out of a session that had already idled out.
    pub fn logout(&self, session_id: &SessionId) -> Result<(), KeywardError> {
        self.sessions.stop(session_id)?;
        tracing::info!(session_id = %session_id, "logout");
        Ok(())
    }

    pub fn sessions(&self) -> &Arc<SessionManager<S>> {
        &self.sessions
    }

    pub fn authenticator(&self) -> &AuthenticationDispatcher {
        &self.authenticator
    }

    pub fn authorizer(&self) -> &AuthorizationEngine {
        &self.authorizer
    }

    pub fn global_session_timeout(&self) -> i64 {
        self.sessions.global_session_timeout()
    }

    pub fn set_global_session_timeout(&self, millis: i64) {
        self.sessions.set_global_session_timeout(millis);
    }

    pub fn add_session_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        self.sessions.add_listener(listener)
    }

    pub fn remove_session_listener(&self, id: ListenerId) -> bool {
        self.sessions.remove_listener(id)
    }

    // =====================================================================
    // Background validation
    // =====================================================================

    /// Starts the periodic expiration sweep. Idempotent.
    pub async fn start_validation(&self) {
        self.validation.lock().await.start();
    }

    /// Stops the sweep and waits for it to finish. Idempotent.
    pub async fn stop_validation(&self) {
        self.validation.lock().await.stop().await;
    }

    pub async fn is_validating(&self) -> bool {
        self.validation.lock().await.is_running()
    }

    pub async fn validation_metrics(&self) -> SweepMetrics {
        self.validation.lock().await.metrics()
    }
}
