//! Credential refresh, persistence and failure-mode behavior.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spotify_status::config::SpotifyConfig;
use spotify_status::display::NullDisplay;
use spotify_status::model::{Credential, CredentialManager, ReplyClassifier, RetryingHttpClient};

const CLIENT_ID: &str = "0123456789abcdef";
const CLIENT_SECRET: &str = "fedcba9876543210";

fn manager(base_url: &str, token_path: &Path) -> CredentialManager {
    let display = Arc::new(NullDisplay);
    let client = RetryingHttpClient::new(display.clone(), 1).expect("http client");
    let classifier = ReplyClassifier::new(display).with_warn_duration(Duration::ZERO);
    let spotify = SpotifyConfig {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
    };
    CredentialManager::new(
        client,
        classifier,
        &spotify,
        "http://spotify-status.local/callback/".to_string(),
        "spotify-status".to_string(),
        token_path,
    )
    .with_base_url(base_url)
}

fn live_credential(expires_in_seconds: i64) -> Credential {
    Credential {
        access_token: "live-access-token".to_string(),
        refresh_token: "live-refresh-token".to_string(),
        expires_at: Utc::now() + ChronoDuration::seconds(expires_in_seconds),
        obtained_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn fresh_credential_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server.uri(), &dir.path().join("refresh_token.txt"));

    let credential = manager.ensure_valid(live_credential(3600)).await.unwrap();
    assert_eq!(credential.access_token, "live-access-token");
}

#[tokio::test]
async fn expiring_credential_refreshes_and_persists_the_new_token() {
    let basic = BASE64.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}"));
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("Authorization", format!("Basic {basic}")))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=live-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh-token",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("refresh_token.txt");
    let manager = manager(&server.uri(), &token_path);

    // 10 s left, inside the refresh margin
    let credential = manager.ensure_valid(live_credential(10)).await.unwrap();

    assert_eq!(credential.access_token, "new-access-token");
    assert_eq!(credential.refresh_token, "new-refresh-token");
    assert!(credential.is_usable());
    assert_eq!(
        std::fs::read_to_string(&token_path).unwrap(),
        "new-refresh-token"
    );
}

#[tokio::test]
async fn unchanged_refresh_token_is_not_rewritten() {
    let server = MockServer::start().await;
    // the endpoint omits refresh_token, so the previous one carries forward
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("refresh_token.txt");
    let manager = manager(&server.uri(), &token_path);

    let credential = manager.refresh(live_credential(10)).await.unwrap();

    assert_eq!(credential.refresh_token, "live-refresh-token");
    assert!(!token_path.exists());
}

#[tokio::test]
async fn client_error_on_refresh_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server.uri(), &dir.path().join("refresh_token.txt"));

    let error = manager.refresh(live_credential(10)).await.unwrap_err();
    assert!(error.to_string().contains("refresh api error 400"));
}

#[tokio::test]
async fn transport_failure_reuses_the_live_credential() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager("http://127.0.0.1:1", &dir.path().join("refresh_token.txt"));

    let credential = manager.refresh(live_credential(10)).await.unwrap();

    // stale but previously obtained, so the loop keeps limping along
    assert_eq!(credential.access_token, "live-access-token");
}

#[tokio::test]
async fn transport_failure_on_a_stored_stub_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager("http://127.0.0.1:1", &dir.path().join("refresh_token.txt"));

    // never obtained from the endpoint, nothing usable to fall back on
    let stub = Credential::from_stored_refresh_token("stored-refresh-token".to_string());
    assert!(manager.refresh(stub).await.is_err());
}

#[tokio::test]
async fn bootstrap_refreshes_a_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=stored-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "stored-refresh-token",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("refresh_token.txt");
    std::fs::write(&token_path, "stored-refresh-token\n").unwrap();
    let manager = manager(&server.uri(), &token_path);

    let credential = manager.bootstrap().await.unwrap();
    assert!(credential.is_usable());
    assert_eq!(credential.access_token, "new-access-token");
}
