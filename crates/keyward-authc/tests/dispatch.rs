//! Integration tests for module selection and failure propagation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keyward_authc::{
    AuthenticationDispatcher, AuthenticationError, AuthenticationInfo,
    AuthenticationToken, CredentialVerificationModule, MemoryIdentityStore,
    StoreBackedModule, TokenKind,
};
use keyward_types::{NamedPermission, Principal, RoleId};

// =========================================================================
// Recording module
// =========================================================================

/// Supports a fixed set of kinds and counts how often it is asked to
/// authenticate. Always succeeds with an empty account.
struct Recording {
    name: &'static str,
    kinds: Vec<TokenKind>,
    calls: Arc<AtomicUsize>,
}

impl Recording {
    fn new(name: &'static str, kinds: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = Self {
            name,
            kinds: kinds.iter().map(|k| TokenKind::new(*k)).collect(),
            calls: Arc::clone(&calls),
        };
        (module, calls)
    }
}

impl CredentialVerificationModule for Recording {
    fn name(&self) -> &str {
        self.name
    }

    fn supports(&self, kind: &TokenKind) -> bool {
        self.kinds.contains(kind)
    }

    fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<AuthenticationInfo, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthenticationInfo::new(
            token.principal().clone(),
            "ignored".into(),
        )
        .with_role(self.name))
    }
}

fn api_key(principal: &str) -> AuthenticationToken {
    AuthenticationToken::new(
        TokenKind::new("api_key"),
        Principal::new(principal),
        "k-123".into(),
    )
}

// =========================================================================
// Selection
// =========================================================================

#[test]
fn test_authenticate_selects_second_module_when_only_it_supports_kind() {
    let (first, first_calls) = Recording::new("first", &["x509"]);
    let (second, second_calls) = Recording::new("second", &["api_key"]);
    let dispatcher = AuthenticationDispatcher::new()
        .with_module(first)
        .with_module(second);

    let identity = dispatcher.authenticate(&api_key("svc")).unwrap();

    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert!(identity.has_role(&RoleId::new("second")));
}

#[test]
fn test_authenticate_first_supporting_module_wins() {
    let (a, a_calls) = Recording::new("a", &["api_key"]);
    let (b, b_calls) = Recording::new("b", &["api_key"]);
    let dispatcher = AuthenticationDispatcher::new().with_module(a).with_module(b);

    dispatcher.authenticate(&api_key("svc")).unwrap();

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_authenticate_no_supporting_module_is_unsupported() {
    let (only, calls) = Recording::new("only", &["x509"]);
    let dispatcher = AuthenticationDispatcher::new().with_module(only);

    let err = dispatcher.authenticate(&api_key("svc")).unwrap_err();

    assert!(matches!(err, AuthenticationError::UnsupportedToken(k) if k.as_str() == "api_key"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_authenticate_empty_dispatcher_is_unsupported() {
    let dispatcher = AuthenticationDispatcher::new();
    assert!(dispatcher.is_empty());
    let token = AuthenticationToken::username_password("alice", "pw");
    assert!(matches!(
        dispatcher.authenticate(&token),
        Err(AuthenticationError::UnsupportedToken(_))
    ));
}

// =========================================================================
// Store-backed flow
// =========================================================================

fn directory() -> MemoryIdentityStore {
    let store = MemoryIdentityStore::new();
    store.insert(
        AuthenticationInfo::new(Principal::new("alice"), "wonderland".into())
            .with_role("reader")
            .with_permission(NamedPermission::shared("book:read")),
    );
    store.insert(
        AuthenticationInfo::new(Principal::new("mallory"), "x".into()).locked(),
    );
    store
}

#[test]
fn test_store_backed_login_returns_identity_with_grants() {
    let dispatcher =
        AuthenticationDispatcher::new().with_module(StoreBackedModule::new(directory()));

    let mut token = AuthenticationToken::username_password("alice", "wonderland");
    let identity = dispatcher.authenticate(&token).unwrap();
    token.clear();

    assert_eq!(identity.principal().as_str(), "alice");
    assert!(identity.has_role(&RoleId::new("reader")));
    assert!(identity.implies(&NamedPermission::new("book:read")));
    assert!(token.is_cleared());
}

#[test]
fn test_module_failures_propagate_unchanged() {
    let dispatcher =
        AuthenticationDispatcher::new().with_module(StoreBackedModule::new(directory()));

    let cases = [
        ("nobody", "pw", "unknown"),
        ("mallory", "x", "locked"),
        ("alice", "looking-glass", "incorrect"),
    ];
    for (user, password, expected) in cases {
        let err = dispatcher
            .authenticate(&AuthenticationToken::username_password(user, password))
            .unwrap_err();
        let kind = match err {
            AuthenticationError::UnknownAccount(_) => "unknown",
            AuthenticationError::LockedAccount(_) => "locked",
            AuthenticationError::IncorrectCredential(_) => "incorrect",
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(kind, expected, "user {user}");
    }
}

#[test]
fn test_module_names_in_dispatch_order() {
    let dispatcher = AuthenticationDispatcher::new()
        .with_module(StoreBackedModule::new(MemoryIdentityStore::new()).with_name("ldap"))
        .with_module(StoreBackedModule::new(MemoryIdentityStore::new()).with_name("local"));
    assert_eq!(dispatcher.module_names(), vec!["ldap", "local"]);
    assert_eq!(dispatcher.len(), 2);
}
