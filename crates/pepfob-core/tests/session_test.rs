#![allow(clippy::unwrap_used)]
// Session lifecycle tests for `SessionManager` against a wiremock router.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pepfob_api::{Method, RouterClient, paths};
use pepfob_core::store::JAR_NAMESPACE;
use pepfob_core::{
    ClientScope, CoreError, CredentialJar, CredentialStore, MemoryStore, PurgePolicy, RouterConfig,
    SessionManager,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn ok(response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "stat": "ok", "response": response }))
}

fn fail(status: u16, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "stat": "fail", "code": code, "message": message
    }))
}

fn client_json(id: &str) -> serde_json::Value {
    json!({ "name": "Client1", "clientId": id, "clientSecret": format!("sec-{id}"), "scope": "api" })
}

fn config(server: &MockServer) -> RouterConfig {
    let mut config = RouterConfig::new(Url::parse(&server.uri()).unwrap(), "admin", secret("pw"));
    config.probe_attempts = 1;
    config.purge = PurgePolicy {
        max_attempts: 3,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };
    config
}

fn manager(server: &MockServer, store: Arc<MemoryStore>) -> SessionManager {
    let config = config(server);
    let client = RouterClient::with_client(reqwest::Client::new(), config.url.clone());
    SessionManager::with_client(client, &config, store)
}

fn seeded_store(cookie: &str, token: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let jar = CredentialJar {
        cookie: Some(secret(cookie)),
        token: Some(secret(token)),
    };
    store.save(JAR_NAMESPACE, &jar.encode().unwrap()).unwrap();
    store
}

fn stored_jar(store: &MemoryStore) -> Option<CredentialJar> {
    store
        .load(JAR_NAMESPACE)
        .unwrap()
        .map(|bytes| CredentialJar::decode(&bytes).unwrap())
}

async fn mount_login(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(paths::LOGIN))
        .respond_with(
            ok(json!({ "permission": { "GET": 1, "POST": 1 } }))
                .insert_header("Set-Cookie", "bauth=fresh-cookie; Path=/"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

// ── Bootstrap ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_session_reuses_first_client_and_is_idempotent() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let session = manager(&server, Arc::clone(&store));

    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([client_json("id-1")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::TOKEN_GRANT))
        .and(body_json(json!({ "clientId": "id-1", "clientSecret": "sec-id-1" })))
        .respond_with(ok(json!({ "accessToken": "tok-1", "expiresIn": 3600 })))
        .expect(1)
        .mount(&server)
        .await;

    let first = session.ensure_session(false).await.unwrap();
    let second = session.ensure_session(false).await.unwrap();
    assert_eq!(first.expose_secret(), "bauth=fresh-cookie");
    assert_eq!(second.expose_secret(), first.expose_secret());

    let jar = stored_jar(&store).unwrap();
    assert_eq!(jar.token.unwrap().expose_secret(), "tok-1");
}

#[tokio::test]
async fn test_ensure_session_with_cached_jar_makes_no_auth_calls() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=cached", "tok-cached"));

    mount_login(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(paths::TOKEN_GRANT))
        .respond_with(ok(json!({ "accessToken": "unused" })))
        .expect(0)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let cookie = session.ensure_session(false).await.unwrap();
        assert_eq!(cookie.expose_secret(), "bauth=cached");
    }
    assert!(session.has_token().await);
}

#[tokio::test]
async fn test_ensure_session_creates_client_when_none_exist() {
    let server = MockServer::start().await;
    let session = manager(&server, Arc::new(MemoryStore::new()));

    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "add", "name": "Client1", "scope": "api" })))
        .respond_with(ok(client_json("new")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::TOKEN_GRANT))
        .respond_with(ok(json!({ "accessToken": "tok-new", "expiresIn": 60 })))
        .mount(&server)
        .await;

    session.ensure_session(false).await.unwrap();
    let clients = session.clients().await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, "new");
    assert_eq!(clients[0].token.as_ref().unwrap().expose_secret(), "tok-new");
    assert_eq!(clients[0].token_expiry_secs, 60);
}

#[tokio::test]
async fn test_ensure_session_unreachable_router() {
    let mut config = RouterConfig::new(Url::parse("http://127.0.0.1:9").unwrap(), "admin", secret("pw"));
    config.probe_attempts = 1;
    let client = RouterClient::with_client(reqwest::Client::new(), config.url.clone());
    let session = SessionManager::with_client(client, &config, Arc::new(MemoryStore::new()));

    let err = session.ensure_session(false).await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got: {err:?}");
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wrong_password_leaves_store_untouched() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let session = manager(&server, Arc::clone(&store));

    Mock::given(method("POST"))
        .and(path(paths::LOGIN))
        .respond_with(fail(200, 301, "Unauthorized"))
        .mount(&server)
        .await;

    let result = session.login("admin", &secret("wrong")).await;
    assert!(
        matches!(result, Err(CoreError::InvalidCredentials)),
        "expected InvalidCredentials, got: {result:?}"
    );
    assert!(!session.has_cookie().await);
    assert!(store.load(JAR_NAMESPACE).unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_jar_is_ignored() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    store.save(JAR_NAMESPACE, b"not a jar").unwrap();

    let session = manager(&server, store);
    assert!(!session.has_cookie().await);
    assert!(!session.has_token().await);
}

// ── In-band recovery ────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retry_succeeds() {
    let server = MockServer::start().await;
    let store = seeded_store("bauth=cached", "tok-old");
    let session = manager(&server, Arc::clone(&store));

    Mock::given(method("GET"))
        .and(path(paths::TRAFFIC))
        .and(query_param("accessToken", "tok-old"))
        .respond_with(fail(401, 401, "Invalid access token"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::TRAFFIC))
        .and(query_param("accessToken", "tok-new"))
        .respond_with(ok(json!({ "bandwidth": { "order": [], "unit": "kbps" } })))
        .expect(1)
        .mount(&server)
        .await;

    // Refresh: list → delete the stale client → list empty → create → grant.
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([client_json("stale")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "remove", "clientId": "stale" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "add", "name": "Client1", "scope": "api" })))
        .respond_with(ok(client_json("fresh")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::TOKEN_GRANT))
        .and(body_json(json!({ "clientId": "fresh", "clientSecret": "sec-fresh" })))
        .respond_with(ok(json!({ "accessToken": "tok-new", "expiresIn": 3600 })))
        .mount(&server)
        .await;

    let err = session
        .send_authenticated(Method::GET, paths::TRAFFIC, &[], None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, CoreError::TokenExpiredOrInvalid { recovered: true }),
        "expected recovered token error, got: {err:?}"
    );
    assert!(err.retry_ready());

    session
        .send_authenticated(Method::GET, paths::TRAFFIC, &[], None)
        .await
        .unwrap();

    let jar = stored_jar(&store).unwrap();
    assert_eq!(jar.token.unwrap().expose_secret(), "tok-new");
    assert_eq!(jar.cookie.unwrap().expose_secret(), "bauth=cached");
}

#[tokio::test]
async fn test_expired_cookie_triggers_relogin() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=stale", "tok-1"));

    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .and(header("Cookie", "bauth=stale"))
        .respond_with(fail(401, 401, "Unauthorized"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .and(header("Cookie", "bauth=fresh-cookie"))
        .respond_with(ok(json!([client_json("id-1")])))
        .mount(&server)
        .await;

    let err = session.list_clients().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired { recovered: true }));
    assert!(err.retry_ready());

    let clients = session.list_clients().await.unwrap();
    assert_eq!(clients.len(), 1);
}

// ── Client administration ───────────────────────────────────────────

#[tokio::test]
async fn test_delete_all_then_create_leaves_one_new_client() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=cached", "tok-1"));

    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([client_json("a"), client_json("b")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([client_json("b")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "remove", "clientId": "a" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "remove", "clientId": "b" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .and(body_json(json!({ "action": "add", "name": "Client1", "scope": "api" })))
        .respond_with(ok(client_json("c")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::TOKEN_GRANT))
        .respond_with(ok(json!({ "accessToken": "tok-c", "expiresIn": 3600 })))
        .mount(&server)
        .await;

    session.delete_all_clients().await.unwrap();
    assert!(session.clients().await.is_empty());

    let created = session.create_client("Client1", ClientScope::ReadWrite).await.unwrap();
    let clients = session.clients().await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, created.id);
    assert!(!["a", "b"].contains(&created.id.as_str()));
}

#[tokio::test]
async fn test_purge_gives_up_after_attempt_cap() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=cached", "tok-1"));

    Mock::given(method("GET"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(ok(json!([client_json("sticky")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(paths::AUTH_CLIENT))
        .respond_with(fail(200, 500, "Busy"))
        .expect(3)
        .mount(&server)
        .await;

    let err = session.delete_all_clients().await.unwrap_err();
    assert!(
        matches!(err, CoreError::ApiRejected { code: None, .. }),
        "expected ApiRejected, got: {err:?}"
    );
    assert!(!err.retry_ready());
}

#[tokio::test]
async fn test_grant_unknown_client_is_rejected_locally() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=cached", "tok-1"));

    let err = session.grant_token("nope").await.unwrap_err();
    assert!(matches!(err, CoreError::NoClient));
}

#[tokio::test]
async fn test_forget_erases_jar() {
    let server = MockServer::start().await;
    let store = seeded_store("bauth=cached", "tok-1");
    let session = manager(&server, Arc::clone(&store));

    session.forget().await.unwrap();
    assert!(!session.has_cookie().await);
    assert!(store.load(JAR_NAMESPACE).unwrap().is_none());
}

// ── Router queries ──────────────────────────────────────────────────

#[tokio::test]
async fn test_system_info_and_location() {
    let server = MockServer::start().await;
    let session = manager(&server, seeded_store("bauth=cached", "tok-1"));

    Mock::given(method("GET"))
        .and(path(paths::SYSTEM_INFO))
        .and(query_param("accessToken", "tok-1"))
        .respond_with(ok(json!({
            "device": { "name": "MAX-BR1", "serialNumber": "1111-2222-3333",
                        "firmwareVersion": "8.4.0", "productCode": "MAX-BR1-MINI",
                        "hardwareRevision": "2" },
            "uptime": { "second": 3725 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::LOCATION))
        .respond_with(ok(json!({
            "location": { "latitude": 22.3, "longitude": 114.1, "altitude": 12 }
        })))
        .mount(&server)
        .await;

    let info = session.system_info().await.unwrap();
    assert_eq!(info.name, "MAX-BR1");
    assert_eq!(info.uptime_secs, 3725);
    assert_eq!(info.serial, "1111-2222-3333");

    let fix = session.location().await.unwrap();
    assert!(fix.has_fix());
    assert_eq!(fix.latitude, "22.3");
}
