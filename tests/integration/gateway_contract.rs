//! Webhook gateway contract tests.
//!
//! Verify the request shape the backend receives and how the many reply
//! shapes workflow tools produce are reduced to display text.

use invader::config::BackendConfig;
use invader::error::WidgetError;
use invader::gateway::{BackendGateway, WebhookGateway};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> WebhookGateway {
    let config = BackendConfig {
        endpoint: format!("{}/webhook/chat", server.uri()),
        ..BackendConfig::default()
    };
    WebhookGateway::new(&config, "session-123").expect("valid config")
}

#[tokio::test]
async fn posts_message_and_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"message": "Hi", "sessionId": "session-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Hello"})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gateway_for(&server).send("Hi").await.unwrap();
    assert_eq!(reply, "Hello");
}

#[tokio::test]
async fn non_json_body_is_used_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    assert_eq!(gateway_for(&server).send("Hi").await.unwrap(), "OK");
}

#[tokio::test]
async fn later_keys_are_probed_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"reply": "", "output": "from output", "text": "from text"})),
        )
        .mount(&server)
        .await;

    assert_eq!(gateway_for(&server).send("Hi").await.unwrap(), "from output");
}

#[tokio::test]
async fn wrapped_array_reply_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"output": "Привет"}])))
        .mount(&server)
        .await;

    assert_eq!(gateway_for(&server).send("Hi").await.unwrap(), "Привет");
}

#[tokio::test]
async fn unknown_object_is_serialized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
        .mount(&server)
        .await;

    let reply = gateway_for(&server).send("Hi").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(parsed, json!({"status": "queued"}));
}

#[tokio::test]
async fn server_error_is_a_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = gateway_for(&server).send("Hi").await.unwrap_err();
    assert!(matches!(err, WidgetError::Backend(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_backend_error() {
    let server = MockServer::start().await;
    let gateway = gateway_for(&server);
    drop(server);

    let err = gateway.send("Hi").await.unwrap_err();
    assert!(matches!(err, WidgetError::Backend(_)), "got {err:?}");
}

#[test]
fn empty_endpoint_is_rejected() {
    let config = BackendConfig {
        endpoint: "  ".into(),
        ..BackendConfig::default()
    };
    let err = WebhookGateway::new(&config, "s").unwrap_err();
    assert!(matches!(err, WidgetError::Config(_)));
}
