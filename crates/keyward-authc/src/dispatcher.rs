//! Routes a token to the module that can verify it.

use keyward_types::Identity;
use tracing::{debug, info};

use crate::{AuthenticationError, AuthenticationToken, CredentialVerificationModule};

/// Ordered list of verification modules.
///
/// The first module (in registration order) whose `supports` accepts the
/// token's kind handles it, and only that module is asked to authenticate.
/// Its failure is the dispatcher's failure: there is no fallback to later
/// modules.
#[derive(Default)]
pub struct AuthenticationDispatcher {
    modules: Vec<Box<dyn CredentialVerificationModule>>,
}

impl AuthenticationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a module (builder style).
    pub fn with_module(
        mut self,
        module: impl CredentialVerificationModule + 'static,
    ) -> Self {
        self.add_module(Box::new(module));
        self
    }

    /// Appends a module.
    pub fn add_module(&mut self, module: Box<dyn CredentialVerificationModule>) {
        debug!(module = module.name(), "authentication module registered");
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Names of the registered modules, in dispatch order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Verifies `token` and returns who the caller is.
    ///
    /// The token is only borrowed and nothing from it is kept, so the caller
    /// can (and should) [`clear`](AuthenticationToken::clear) it afterwards.
    ///
    /// # Errors
    /// - [`AuthenticationError::UnsupportedToken`] if no module supports the
    ///   token's kind
    /// - whatever the selected module returned, unchanged
    pub fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Identity, AuthenticationError> {
        let module = self
            .modules
            .iter()
            .find(|m| m.supports(token.kind()))
            .ok_or_else(|| AuthenticationError::UnsupportedToken(token.kind().clone()))?;

        debug!(
            module = module.name(),
            kind = %token.kind(),
            principal = %token.principal(),
            "authentication module selected"
        );

        match module.authenticate(token) {
            Ok(info) => {
                info!(
                    principal = %info.principal,
                    module = module.name(),
                    "authentication succeeded"
                );
                Ok(info.to_identity())
            }
            Err(e) => {
                info!(
                    principal = %token.principal(),
                    module = module.name(),
                    error = %e,
                    "authentication failed"
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for AuthenticationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationDispatcher")
            .field("modules", &self.module_names())
            .finish()
    }
}
