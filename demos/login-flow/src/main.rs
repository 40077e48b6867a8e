use std::sync::Arc;
use std::time::Duration;

use keyward::prelude::*;
use keyward::session::ListenerError;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Short timeouts so the sweep has something to do within a few seconds.
const CONFIG: &str = r#"{
    "session": { "global_timeout_millis": 1500 },
    "validation": { "interval_millis": 1000 }
}"#;

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

struct AuditLog;

impl SessionListener for AuditLog {
    fn on_start(&self, s: &Session) -> Result<(), ListenerError> {
        tracing::info!(session_id = %s.id(), host = s.host().unwrap_or("-"), "audit: session opened");
        Ok(())
    }

    fn on_stop(&self, s: &Session) -> Result<(), ListenerError> {
        tracing::info!(session_id = %s.id(), "audit: session closed");
        Ok(())
    }

    fn on_expiration(&self, s: &Session) -> Result<(), ListenerError> {
        tracing::info!(session_id = %s.id(), "audit: session timed out");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: SecurityConfig = serde_json::from_str(CONFIG)?;

    let users = MemoryIdentityStore::new();
    users.insert(
        AuthenticationInfo::new(Principal::new("ada"), "analytical-engine".into())
            .with_role("admin")
            .with_permission(NamedPermission::shared("ledger:read"))
            .with_permission(NamedPermission::shared("ledger:write")),
    );
    users.insert(
        AuthenticationInfo::new(Principal::new("bob"), "hunter2".into())
            .with_permission(NamedPermission::shared("ledger:read")),
    );
    users.insert(AuthenticationInfo::new(Principal::new("eve"), "x".into()).locked());

    let security = SecurityManagerBuilder::new()
        .config(config)
        .authentication_module(StoreBackedModule::new(users).with_name("local"))
        .authorization_module(RoleModule)
        .authorization_module(PermissionModule)
        .listener(Arc::new(AuditLog))
        .build(MemorySessionStore::new());

    security.start_validation().await;

    // Failed logins: wrong password, locked account.
    for (user, password) in [("bob", "hunter3"), ("eve", "x")] {
        let token = AuthenticationToken::username_password(user, password);
        if let Err(e) = security.login(token, Some("203.0.113.9")) {
            tracing::warn!(user, error = %e, "login rejected");
        }
    }

    let ada = security.login(
        AuthenticationToken::username_password("ada", "analytical-engine"),
        Some("198.51.100.1"),
    )?;
    let bob = security.login(
        AuthenticationToken::username_password("bob", "hunter2"),
        Some("198.51.100.2"),
    )?;

    let write = Action::permission("ledger:write");
    for login in [&ada, &bob] {
        let allowed = security.is_permitted(&login.session_id, &login.identity, &write)?;
        tracing::info!(
            principal = %login.identity.principal(),
            %write,
            allowed,
            "authorization check"
        );
    }

    security.logout(&ada.session_id)?;

    // Bob goes idle; the background sweep expires his session.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    match security.is_permitted(&bob.session_id, &bob.identity, &write) {
        Err(e) if e.is_session_gone() => tracing::info!(error = %e, "bob must log in again"),
        other => tracing::warn!(?other, "unexpected result for idle session"),
    }

    let metrics = security.validation_metrics().await;
    tracing::info!(
        sweeps = metrics.total_sweeps,
        expired = metrics.total_expired,
        "validation summary"
    );
    security.stop_validation().await;
    Ok(())
}
