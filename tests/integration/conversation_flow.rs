//! End-to-end conversation scenarios through a running widget loop.

use crate::helpers::{
    ScriptedGateway, drain_events, fast_config, next_message, spawn_widget, wait_for_status,
};
use invader::character::CharacterState;
use invader::config::WidgetConfig;
use invader::gateway::WebhookGateway;
use invader::runtime::{MessageAuthor, RuntimeEvent};
use invader::speech::input::RecognitionSessionState;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn webhook_config(server: &MockServer) -> WidgetConfig {
    let mut config = fast_config();
    config.backend.endpoint = format!("{}/webhook", server.uri());
    config
}

#[tokio::test]
async fn typed_message_is_answered_and_spoken_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"message": "Hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "Hello"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = webhook_config(&server);
    let gateway = WebhookGateway::new(&config.backend, "session-1").unwrap();
    let mut widget = spawn_widget(&config, Arc::new(gateway));

    widget.handle.submit_text("Hi").unwrap();
    let user = next_message(&mut widget.runtime, MessageAuthor::User).await;
    assert_eq!(user.text, "Hi");
    let bot = next_message(&mut widget.runtime, MessageAuthor::Bot).await;
    assert_eq!(bot.text, "Hello");

    let status = widget.handle.status().await.unwrap();
    assert_eq!(status.state, CharacterState::Talking);
    assert!(status.speaking);
    assert_eq!(widget.spoken.texts(), vec!["Hello".to_owned()]);
}

#[tokio::test]
async fn plain_text_reply_is_displayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let config = webhook_config(&server);
    let gateway = WebhookGateway::new(&config.backend, "session-1").unwrap();
    let mut widget = spawn_widget(&config, Arc::new(gateway));

    widget.handle.submit_text("Hi").unwrap();
    let bot = next_message(&mut widget.runtime, MessageAuthor::Bot).await;
    assert_eq!(bot.text, "OK");
}

#[tokio::test]
async fn backend_failure_shows_apology_and_idles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = webhook_config(&server);
    let gateway = WebhookGateway::new(&config.backend, "session-1").unwrap();
    let mut widget = spawn_widget(&config, Arc::new(gateway));

    widget.handle.submit_text("Hi").unwrap();
    let bot = next_message(&mut widget.runtime, MessageAuthor::Bot).await;
    assert_eq!(bot.text, "Sorry, the assistant is unavailable.");

    let status = widget.handle.status().await.unwrap();
    assert_eq!(status.state, CharacterState::Idle);
    assert!(!status.speaking);
    assert_eq!(status.pending_requests, 0);
    assert!(widget.spoken.texts().is_empty());
}

#[tokio::test]
async fn finished_speech_returns_to_idle_and_reopens_microphone() {
    let gateway = Arc::new(ScriptedGateway::default());
    gateway.push_reply(Ok("Hello".into()));
    let mut widget = spawn_widget(&fast_config(), gateway.clone());

    widget.handle.set_microphone(true).unwrap();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;

    widget.input.hear("Привет");
    let user = next_message(&mut widget.runtime, MessageAuthor::User).await;
    assert_eq!(user.text, "Привет");
    next_message(&mut widget.runtime, MessageAuthor::Bot).await;
    assert_eq!(gateway.received(), vec!["Привет".to_owned()]);

    widget.spoken.finish_last();
    let status = wait_for_status(&widget.handle, |s| {
        !s.speaking && s.recognition == RecognitionSessionState::Active
    })
    .await;
    assert_eq!(status.state, CharacterState::Idle);
    assert!(widget.input.starts() >= 2);
}

#[tokio::test]
async fn transcript_heard_while_speaking_is_dropped() {
    let gateway = Arc::new(ScriptedGateway::default());
    let mut widget = spawn_widget(&fast_config(), gateway.clone());

    widget.handle.set_microphone(true).unwrap();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;

    widget.handle.start(false).unwrap();
    wait_for_status(&widget.handle, |s| s.speaking).await;
    drain_events(&mut widget.runtime);

    // The platform delivers a late result for the session we just stopped.
    widget.input.hear("echo of the greeting");
    let status = widget.handle.status().await.unwrap();
    assert!(status.speaking);
    assert_eq!(status.state, CharacterState::Talking);

    let events = drain_events(&mut widget.runtime);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, RuntimeEvent::Message(m) if m.author == MessageAuthor::User)),
        "no user message while speaking: {events:?}"
    );
    assert!(gateway.received().is_empty());
}

#[tokio::test]
async fn greeting_is_shown_spoken_and_arms_microphone() {
    let gateway = Arc::new(ScriptedGateway::default());
    let mut widget = spawn_widget(&fast_config(), gateway);

    widget.handle.start(true).unwrap();
    let bot = next_message(&mut widget.runtime, MessageAuthor::Bot).await;
    assert_eq!(bot.text, "Welcome!");
    assert_eq!(widget.spoken.texts(), vec!["Welcome!".to_owned()]);

    wait_for_status(&widget.handle, |s| s.microphone_intent).await;
    assert_eq!(widget.input.starts(), 0, "microphone waits for the greeting");

    widget.spoken.finish_last();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;
}

#[tokio::test]
async fn textures_are_ready_after_media_reports() {
    let widget = spawn_widget(&fast_config(), Arc::new(ScriptedGateway::default()));
    let status = widget.handle.status().await.unwrap();
    assert!(status.textures_ready);
}
