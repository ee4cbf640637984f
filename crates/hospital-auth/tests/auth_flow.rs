//! Register and login against the in-memory record store.

use std::sync::Arc;
use std::time::Duration;

use hospital_auth::{AuthConfig, AuthError, AuthService, LoginRequest, Profile, RegisterRequest};
use hospital_db_memory::InMemoryStore;
use hospital_storage::{Filter, RecordStore, Select};

fn service(store: &InMemoryStore) -> AuthService {
    let config = AuthConfig::new("0123456789abcdef0123456789abcdef")
        .with_token_ttl(Duration::from_secs(600));
    AuthService::new(Arc::new(store.clone()), &config).unwrap()
}

fn jane() -> RegisterRequest {
    RegisterRequest {
        username: "jane".into(),
        password: "s3cret!".into(),
        role: "patient".into(),
        id: "P1".into(),
    }
}

#[tokio::test]
async fn register_login_and_verify() {
    let store = InMemoryStore::with_hospital_schema();
    let auth = service(&store);

    auth.register(&jane()).await.unwrap();
    assert_eq!(store.count("users").await, 1);

    let login = auth
        .login(&LoginRequest {
            username: "jane".into(),
            password: "s3cret!".into(),
        })
        .await
        .unwrap();
    assert_eq!(login.token_type, "Bearer");
    assert_eq!(login.expires_in, 600);
    assert_eq!(login.role, "patient");

    let claims = auth.verify(&login.token).unwrap();
    assert_eq!(
        Profile::from(&claims),
        Profile {
            username: "jane".into(),
            role: "patient".into(),
            patient_id: "P1".into(),
        }
    );
}

#[tokio::test]
async fn password_is_not_stored_in_clear() {
    let store = InMemoryStore::with_hospital_schema();
    service(&store).register(&jane()).await.unwrap();

    let rows = store
        .select(&Select::from("users").filter(Filter::eq("username", "jane")))
        .await
        .unwrap();
    let stored = rows[0].value("password_hash").render_text();
    assert!(stored.starts_with("$argon2id$"));
    assert!(!stored.contains("s3cret!"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let store = InMemoryStore::with_hospital_schema();
    let auth = service(&store);
    auth.register(&jane()).await.unwrap();

    let err = auth.register(&jane()).await.unwrap_err();
    assert!(matches!(err, AuthError::UsernameTaken { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_registrations_of_one_name_yield_one_conflict() {
    let store = InMemoryStore::with_hospital_schema();
    let auth = service(&store);

    let (jane_a, jane_b) = (jane(), jane());
    let (first, second) = tokio::join!(auth.register(&jane_a), auth.register(&jane_b));
    let results = [first, second];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AuthError::UsernameTaken { .. }))),
        "loser must see a conflict, got {results:?}"
    );
    assert_eq!(store.count("users").await, 1);
}

#[tokio::test]
async fn blank_fields_are_invalid_requests() {
    let store = InMemoryStore::with_hospital_schema();
    let auth = service(&store);

    let mut missing_id = jane();
    missing_id.id = " ".into();
    assert!(matches!(
        auth.register(&missing_id).await,
        Err(AuthError::InvalidRequest { .. })
    ));
    assert!(matches!(
        auth.login(&LoginRequest::default()).await,
        Err(AuthError::InvalidRequest { .. })
    ));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let store = InMemoryStore::with_hospital_schema();
    let auth = service(&store);
    auth.register(&jane()).await.unwrap();

    let wrong = auth
        .login(&LoginRequest {
            username: "jane".into(),
            password: "guess".into(),
        })
        .await
        .unwrap_err();
    let unknown = auth
        .login(&LoginRequest {
            username: "bob".into(),
            password: "guess".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(wrong.to_string(), unknown.to_string());
    assert!(wrong.is_authentication_error());
}

#[test]
fn weak_secret_fails_construction() {
    let store = InMemoryStore::with_hospital_schema();
    let result = AuthService::new(Arc::new(store), &AuthConfig::new("short"));
    assert!(matches!(result, Err(AuthError::Configuration { .. })));
}
