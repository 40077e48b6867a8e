//! Top-level configuration.

use keyward_session::SessionConfig;
use keyward_validation::ValidationConfig;
use serde::{Deserialize, Serialize};

/// Everything the [`SecurityManager`](crate::SecurityManager) needs to be
/// told up front. Loading it (TOML, env, JSON) is the host's business; it
/// only has to produce this struct.
///
/// Every field has a default, so a config file may leave any of them out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub session: SessionConfig,
    pub validation: ValidationConfig,
}
