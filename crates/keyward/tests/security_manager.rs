//! End-to-end tests through the `SecurityManager` facade.

use std::sync::Arc;
use std::time::Duration;

use keyward::prelude::*;
use keyward::session::ListenerError;
use keyward::PRINCIPAL_ATTRIBUTE;
use parking_lot::Mutex;

// =========================================================================
// Helpers
// =========================================================================

fn directory() -> MemoryIdentityStore {
    let users = MemoryIdentityStore::new();
    users.insert(
        AuthenticationInfo::new(Principal::new("ann"), "correct horse".into())
            .with_role("analyst")
            .with_permission(NamedPermission::shared("report:read")),
    );
    users.insert(AuthenticationInfo::new(Principal::new("lou"), "pw".into()).locked());
    users
}

fn config(timeout_ms: i64) -> SecurityConfig {
    SecurityConfig {
        session: SessionConfig {
            global_timeout_millis: timeout_ms,
        },
        validation: ValidationConfig::with_interval(Duration::from_secs(1)),
    }
}

fn security(
    timeout_ms: i64,
) -> (SecurityManager<Arc<MemorySessionStore>>, Arc<MemorySessionStore>, ManualClock) {
    let store = Arc::new(MemorySessionStore::new());
    let clock = ManualClock::new(10_000);
    let manager = SecurityManagerBuilder::new()
        .config(config(timeout_ms))
        .clock(clock.clone())
        .authentication_module(StoreBackedModule::new(directory()))
        .authorization_module(RoleModule)
        .authorization_module(PermissionModule)
        .build(Arc::clone(&store));
    (manager, store, clock)
}

fn ann() -> AuthenticationToken {
    AuthenticationToken::username_password("ann", "correct horse")
}

#[derive(Default)]
struct Audit(Mutex<Vec<String>>);

impl SessionListener for Audit {
    fn on_start(&self, s: &Session) -> Result<(), ListenerError> {
        self.0.lock().push(format!("start {}", s.host().unwrap_or("-")));
        Ok(())
    }

    fn on_stop(&self, _s: &Session) -> Result<(), ListenerError> {
        self.0.lock().push("stop".into());
        Ok(())
    }

    fn on_expiration(&self, _s: &Session) -> Result<(), ListenerError> {
        self.0.lock().push("expiration".into());
        Ok(())
    }
}

// =========================================================================
// Login
// =========================================================================

#[test]
fn test_login_starts_session_bound_to_principal() {
    let (security, store, _clock) = security(60_000);

    let login = security.login(ann(), Some("192.0.2.4")).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(login.identity.principal().as_str(), "ann");
    assert_eq!(
        security.session_principal(&login.session_id).unwrap(),
        Some(Principal::new("ann"))
    );
    assert_eq!(
        security.sessions().get_host(&login.session_id).unwrap().as_deref(),
        Some("192.0.2.4")
    );
    assert!(
        security
            .sessions()
            .get_attribute_keys(&login.session_id)
            .unwrap()
            .contains(&PRINCIPAL_ATTRIBUTE.to_string())
    );
}

#[test]
fn test_login_rejected_creates_no_session() {
    let (security, store, _clock) = security(60_000);

    let wrong = security.login(
        AuthenticationToken::username_password("ann", "battery staple"),
        None,
    );
    let locked = security.login(AuthenticationToken::username_password("lou", "pw"), None);

    assert!(matches!(
        wrong,
        Err(KeywardError::Authentication(AuthenticationError::IncorrectCredential(_)))
    ));
    assert!(matches!(
        locked,
        Err(KeywardError::Authentication(AuthenticationError::LockedAccount(_)))
    ));
    assert!(store.is_empty());
}

#[test]
fn test_login_without_host_refused_when_factory_requires_one() {
    let store = Arc::new(MemorySessionStore::new());
    let security = SecurityManagerBuilder::new()
        .session_factory(RandomIdFactory::new().requiring_host())
        .authentication_module(StoreBackedModule::new(directory()))
        .build(Arc::clone(&store));

    let anonymous = security.login(ann(), None);
    assert!(matches!(
        anonymous,
        Err(KeywardError::Session(SessionError::HostRequired))
    ));
    assert!(store.is_empty());

    security.login(ann(), Some("198.51.100.3")).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn test_login_unsupported_token_kind() {
    let (security, _store, _clock) = security(60_000);
    let token = AuthenticationToken::new(
        TokenKind::new("x509"),
        Principal::new("ann"),
        Credentials::new(vec![1, 2, 3]),
    );
    assert!(matches!(
        security.login(token, None),
        Err(KeywardError::Authentication(AuthenticationError::UnsupportedToken(_)))
    ));
}

// =========================================================================
// Authorization through a session
// =========================================================================

#[test]
fn test_is_permitted_checks_votes_and_touches_session() {
    let (security, _store, clock) = security(100);
    let login = security.login(ann(), None).unwrap();

    for _ in 0..5 {
        clock.advance(Duration::from_millis(80));
        assert!(
            security
                .is_permitted(&login.session_id, &login.identity, &Action::role("analyst"))
                .unwrap()
        );
    }
    // 400 ms since login, but each check reset the idle clock.
    assert!(
        !security
            .is_permitted(&login.session_id, &login.identity, &Action::permission("report:delete"))
            .unwrap()
    );
}

#[test]
fn test_is_permitted_on_expired_session_fails_before_voting() {
    let (security, store, clock) = security(100);
    let login = security.login(ann(), None).unwrap();
    clock.advance(Duration::from_millis(150));

    let result =
        security.is_permitted(&login.session_id, &login.identity, &Action::role("analyst"));

    assert!(matches!(
        result,
        Err(KeywardError::Session(SessionError::Expired(_)))
    ));
    assert!(result.unwrap_err().is_session_gone());
    assert!(store.is_empty());
}

#[test]
fn test_no_authorization_modules_denies() {
    let manager = SecurityManagerBuilder::new()
        .authentication_module(StoreBackedModule::new(directory()))
        .build(MemorySessionStore::new());
    let login = manager.login(ann(), None).unwrap();

    assert!(
        !manager
            .is_permitted(&login.session_id, &login.identity, &Action::role("analyst"))
            .unwrap()
    );
}

#[test]
fn test_custom_strategy_is_used() {
    let manager = SecurityManagerBuilder::new()
        .authentication_module(StoreBackedModule::new(directory()))
        .authorization_module(RoleModule)
        .authorization_module(|_: &Identity, _: &Action| Vote::Abstain)
        .strategy(UnanimousStrategy)
        .build(MemorySessionStore::new());
    let login = manager.login(ann(), None).unwrap();

    assert_eq!(manager.authorizer().strategy().name(), "unanimous");
    assert!(
        !manager
            .is_permitted(&login.session_id, &login.identity, &Action::role("analyst"))
            .unwrap()
    );
}

// =========================================================================
// Logout and listeners
// =========================================================================

#[test]
fn test_logout_twice_notifies_once_and_reports_gone() {
    let audit = Arc::new(Audit::default());
    let manager = SecurityManagerBuilder::new()
        .authentication_module(StoreBackedModule::new(directory()))
        .listener(audit.clone())
        .build(MemorySessionStore::new());

    let login = manager.login(ann(), Some("kiosk")).unwrap();
    manager.logout(&login.session_id).unwrap();
    let again = manager.logout(&login.session_id);

    assert!(again.unwrap_err().is_session_gone());

    assert_eq!(*audit.0.lock(), vec!["start kiosk", "stop"]);
    assert!(matches!(
        manager.session_principal(&login.session_id),
        Err(KeywardError::Session(SessionError::NotFound(_)))
    ));
}

#[test]
fn test_global_timeout_passthrough() {
    let (security, _store, clock) = security(60_000);
    let login = security.login(ann(), None).unwrap();

    security.set_global_session_timeout(10);
    assert_eq!(security.global_session_timeout(), 10);
    clock.advance(Duration::from_millis(20));

    assert!(!security.sessions().is_valid(&login.session_id).unwrap());
}

// =========================================================================
// Background validation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_validation_sweep_expires_idle_logins() {
    let (security, store, clock) = security(100);
    let audit = Arc::new(Audit::default());
    security.add_session_listener(audit.clone());
    security.login(ann(), None).unwrap();

    security.start_validation().await;
    security.start_validation().await;
    assert!(security.is_validating().await);

    clock.advance(Duration::from_millis(500));
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert!(store.is_empty());
    assert_eq!(*audit.0.lock(), vec!["start -", "expiration"]);
    assert_eq!(security.validation_metrics().await.total_expired, 1);

    security.stop_validation().await;
    assert!(!security.is_validating().await);
}
