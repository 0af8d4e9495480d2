#![allow(clippy::unwrap_used)]
// Integration tests for `MultitekClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diafon_api::{CallState, Error, Identity, MultitekClient};

// ── Helpers ─────────────────────────────────────────────────────────

const ROOT: &str = "/multitek_service/root";

async fn setup_with(identity: Identity) -> (MockServer, MultitekClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}{ROOT}", server.uri())).unwrap();
    let client = MultitekClient::with_client(reqwest::Client::new(), base_url, identity);
    (server, client)
}

async fn setup() -> (MockServer, MultitekClient) {
    setup_with(Identity::new("user@example.com", "PHONE-1")).await
}

fn endpoint(name: &str) -> String {
    format!("{ROOT}/{name}")
}

async fn mount_text(server: &MockServer, name: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path(endpoint(name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_json(server: &MockServer, name: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(endpoint(name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn request_bodies(server: &MockServer, name: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == endpoint(name))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ── Request conventions ─────────────────────────────────────────────

#[tokio::test]
async fn test_requests_carry_identity_and_service_auth() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("getAccount")))
        .and(basic_auth("multitek", "Mlt.3838!"))
        .and(body_partial_json(json!({
            "email": "user@example.com",
            "phone_id": "PHONE-1",
            "language": "tr-TR"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "user@example.com",
            "sip": "1001"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = client.get_account().await.unwrap();
    assert_eq!(account.sip.as_deref(), Some("1001"));
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("getUserLocations")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get_locations().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_is_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("getCallAllRecords")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.get_call_records().await.unwrap_err();
    assert!(!err.is_authentication());
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_malformed_json_keeps_raw_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("getAccount")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("{not json"),
        )
        .mount(&server)
        .await;

    match client.get_account().await {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "{not json"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_without_password_caches_sip() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "sip": "1001"}),
    )
    .await;

    client.login().await.unwrap();
    assert_eq!(client.user_sip().as_deref(), Some("1001"));
}

#[tokio::test]
async fn test_login_without_email_is_authentication_error() {
    let (server, client) = setup().await;
    mount_json(&server, "getAccount", json!({"sip": "1001"})).await;

    let err = client.login().await.unwrap_err();
    assert!(err.is_authentication(), "got: {err:?}");
}

#[tokio::test]
async fn test_login_transport_failure_stays_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("getAccount")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.login().await.unwrap_err();
    assert!(!err.is_authentication(), "got: {err:?}");
}

#[tokio::test]
async fn test_login_with_password_sends_md5_digest() {
    let identity = Identity::new("user@example.com", "PHONE-1")
        .with_password(SecretString::from("secret"));
    let (server, client) = setup_with(identity).await;

    Mock::given(method("POST"))
        .and(path(endpoint("userAccountControl")))
        .and(body_partial_json(json!({
            "password": "5ebe2294ecd0e0f08eab7690d2a6ee69",
            "pushy_token": "",
            "push_kit_token": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "sip": "2002"}),
    )
    .await;

    client.login().await.unwrap();
    assert_eq!(client.user_sip().as_deref(), Some("2002"));
}

#[tokio::test]
async fn test_login_with_password_rejected() {
    let identity =
        Identity::new("user@example.com", "PHONE-1").with_password(SecretString::from("wrong"));
    let (server, client) = setup_with(identity).await;
    mount_text(&server, "userAccountControl", "0").await;

    let err = client.login().await.unwrap_err();
    assert!(err.is_authentication(), "got: {err:?}");
}

// ── Lists ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_locations_decode_devices_and_rooms() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getUserLocations",
        json!([{
            "location_id": "L1",
            "location_name": "Home",
            "location_devices": [{"sip": "D1", "mac": "aa:bb", "version": 3}],
            "location_rooms": [{"block_num": "1", "room_num": "01"}]
        }]),
    )
    .await;

    let locations = client.get_locations().await.unwrap();
    assert_eq!(locations.len(), 1);
    let home = &locations[0];
    assert_eq!(home.location_name, "Home");
    assert_eq!(home.device().unwrap().sip, "D1");
    assert_eq!(home.device().unwrap().version.as_deref(), Some("3"));
    assert_eq!(home.room().unwrap().room_id(), "101");
}

#[tokio::test]
async fn test_non_list_reply_is_empty() {
    let (server, client) = setup().await;
    mount_text(&server, "getCallAllRecords", "0").await;

    assert!(client.get_call_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getCallAllRecords",
        json!([
            {"call_id": "a", "call_state": "Missed", "date": "1000", "location_id": "L1"},
            "garbage",
            {"call_id": "b", "call_state": "Outgoing", "date": 2000, "location_id": "L1"}
        ]),
    )
    .await;

    let calls = client.get_call_records().await.unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].call_state, CallState::Missed);
    assert_eq!(calls[1].timestamp_ms(), 2000);
}

// ── Active call ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_ask_current_call_none_marker() {
    let (server, client) = setup().await;
    mount_json(&server, "askCurrentCall", json!({"call_id": "-1"})).await;

    assert!(client.ask_current_call().await.is_none());
}

#[tokio::test]
async fn test_ask_current_call_active() {
    let (server, client) = setup().await;
    mount_json(&server, "askCurrentCall", json!({"call_id": "c-77", "call_from": "D1"})).await;

    let call = client.ask_current_call().await.unwrap();
    assert_eq!(call.call_id, "c-77");
}

#[tokio::test]
async fn test_ask_current_call_swallows_errors() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("askCurrentCall")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client.ask_current_call().await.is_none());
}

// ── Door ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_open_door_two_step_success() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "sip": "1001"}),
    )
    .await;
    mount_text(&server, "addCall", "1").await;
    mount_text(&server, "setCallDuration", "1").await;

    assert!(client.open_door("D1", "L1").await.unwrap());

    let add = request_bodies(&server, "addCall").await;
    assert_eq!(add.len(), 1);
    let model = &add[0]["call_model"];
    let call_id = model["call_id"].as_str().unwrap();
    assert_eq!(call_id.len(), 32);
    assert!(call_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(model["call_from"], "1001");
    assert_eq!(model["call_to"], "D1");
    assert_eq!(model["location_id"], "L1");
    assert_eq!(model["call_state"], "Outgoing");
    assert_eq!(model["call_type"], "DEVICE_TYPE_GATEWAY_DOOR");

    let duration = request_bodies(&server, "setCallDuration").await;
    assert_eq!(duration[0]["call_id"], call_id);
    assert_eq!(duration[0]["call_duration"], "6");
}

#[tokio::test]
async fn test_open_door_fails_when_duration_rejected() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "sip": "1001"}),
    )
    .await;
    mount_text(&server, "addCall", "1").await;
    mount_text(&server, "setCallDuration", "0").await;

    assert!(!client.open_door("D1", "L1").await.unwrap());
}

#[tokio::test]
async fn test_open_door_stops_after_add_call_failure() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "sip": "1001"}),
    )
    .await;
    mount_text(&server, "addCall", "0").await;

    Mock::given(method("POST"))
        .and(path(endpoint("setCallDuration")))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!client.open_door("D1", "L1").await.unwrap());
}

#[tokio::test]
async fn test_open_door_without_sip_is_error() {
    let (server, client) = setup().await;
    mount_json(&server, "getAccount", json!({"email": "user@example.com"})).await;

    let result = client.open_door("D1", "L1").await;
    assert!(
        matches!(result, Err(Error::MissingSip)),
        "expected MissingSip, got: {result:?}"
    );
}

#[tokio::test]
async fn test_open_door_with_call_markers() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("controlCurrentCall")))
        .and(body_partial_json(json!({"call_id": "c-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint("controlCurrentCall")))
        .and(body_partial_json(json!({"call_id": "c-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("0"))
        .mount(&server)
        .await;

    assert!(client.open_door_with_call("c-1").await.unwrap());
    assert!(!client.open_door_with_call("c-2").await.unwrap());
}

// ── Push credentials ────────────────────────────────────────────────

#[tokio::test]
async fn test_pushy_credentials_from_first_phone() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({
            "email": "user@example.com",
            "phone_list": [{"token": "tok-1", "info": "iPhone"}, {"token": "tok-2"}]
        }),
    )
    .await;

    let creds = client.get_pushy_credentials().await.unwrap();
    assert_eq!(creds.token, "tok-1");
}

#[tokio::test]
async fn test_pushy_credentials_missing_phone_list() {
    let (server, client) = setup().await;
    mount_json(&server, "getAccount", json!({"email": "user@example.com"})).await;

    assert!(client.get_pushy_credentials().await.is_none());
}

#[tokio::test]
async fn test_pushy_credentials_empty_token() {
    let (server, client) = setup().await;
    mount_json(
        &server,
        "getAccount",
        json!({"email": "user@example.com", "phone_list": [{"token": ""}]}),
    )
    .await;

    assert!(client.get_pushy_credentials().await.is_none());
}

// ── App resume & media ──────────────────────────────────────────────

#[tokio::test]
async fn test_resume_app_sends_app_info() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(endpoint("resumeApp")))
        .and(body_partial_json(json!({
            "phoneInfo": "diafon",
            "locationLat": -1,
            "pushyToken": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client
        .resume_app(&diafon_api::AppInfo::default())
        .await
        .unwrap();
    assert!(reply.is_success());
}

#[tokio::test]
async fn test_fetch_snapshot_resolves_against_origin() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/snapshots/ring.jpg"))
        .and(basic_auth("multitek", "Mlt.3838!"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .mount(&server)
        .await;

    let image = client.fetch_snapshot("/snapshots/ring.jpg").await.unwrap();
    assert_eq!(image.as_ref(), &[0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn test_fetch_snapshot_missing_is_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/snapshots/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.fetch_snapshot("/snapshots/gone.jpg").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}
