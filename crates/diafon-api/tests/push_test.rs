#![allow(clippy::unwrap_used)]
// Integration tests for the Pushy listener using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diafon_api::{Error, PushClient, PushConfig, PushCredentials, PushState};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PushClient) {
    let server = MockServer::start().await;
    let config = PushConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        listen_timeout: Duration::from_secs(2),
        status_backoff: Duration::from_millis(20),
        error_backoff: Duration::from_millis(20),
    };
    let credentials = PushCredentials {
        token: "device-token".into(),
        auth: SecretString::from("app-auth"),
    };
    let client = PushClient::new(
        reqwest::Client::new(),
        config,
        credentials,
        CancellationToken::new(),
    );
    (server, client)
}

async fn mount_success(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(server)
        .await;
}

fn topics() -> Vec<String> {
    vec!["location_L1".into(), "room_L1_101".into()]
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_delivers_notifications() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/auth"))
        .and(body_partial_json(json!({"auth": "app-auth", "token": "device-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/subscribe"))
        .and(body_partial_json(json!({"topics": ["location_L1", "room_L1_101"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/listen"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"notification": {"data": {"call_id": "c-1"}}}))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/unsubscribe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut rx = client.subscribe();
    client.connect(topics()).await.unwrap();
    assert!(client.is_connected());
    assert_eq!(client.topics().await, topics());

    let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.data["call_id"], "c-1");
    assert_eq!(client.state(), PushState::Listening);

    client.disconnect().await;
    assert_eq!(client.state(), PushState::Disconnected);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_auth_rejection_is_push_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let result = client.connect(topics()).await;
    assert!(
        matches!(result, Err(Error::Push(_))),
        "expected Push error, got: {result:?}"
    );
    assert_eq!(client.state(), PushState::Disconnected);
}

#[tokio::test]
async fn test_subscribe_http_error_is_push_error() {
    let (server, client) = setup().await;
    mount_success(&server, "/devices/auth").await;

    Mock::given(method("POST"))
        .and(path("/devices/subscribe"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = client.connect(topics()).await.unwrap_err();
    assert!(matches!(err, Error::Push(_)));
    assert_eq!(client.state(), PushState::Authenticated);
}

#[tokio::test]
async fn test_empty_polls_and_rejections_emit_nothing() {
    let (server, client) = setup().await;
    mount_success(&server, "/devices/auth").await;
    mount_success(&server, "/devices/subscribe").await;
    mount_success(&server, "/devices/unsubscribe").await;

    Mock::given(method("POST"))
        .and(path("/devices/listen"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/listen"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"notification": {}}))
                .set_delay(Duration::from_millis(10)),
        )
        .mount(&server)
        .await;

    let mut rx = client.subscribe();
    client.connect(topics()).await.unwrap();

    let received = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(received.is_err(), "no notification expected");

    client.disconnect().await;
    assert_eq!(client.state(), PushState::Disconnected);
}
