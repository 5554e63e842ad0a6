//! Recovery scenarios: silent speech engines, manual reset, stale callbacks
//! and recognition failures. Runs on the paused clock.

use crate::helpers::{ScriptedGateway, drain_events, spawn_widget, wait_for_status};
use invader::character::CharacterState;
use invader::config::WidgetConfig;
use invader::runtime::{MessageAuthor, RuntimeEvent};
use invader::shortcut::KeyPress;
use invader::speech::input::{RecognitionErrorKind, RecognitionSessionState};
use invader::speech::output::{SpeechOutputEvent, SpeechOutputEventKind};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn silent_speech_engine_cannot_wedge_the_avatar() {
    let gateway = Arc::new(ScriptedGateway::default());
    gateway.push_reply(Ok("Hello".into()));
    let widget = spawn_widget(&WidgetConfig::default(), gateway);

    widget.handle.submit_text("Hi").unwrap();
    wait_for_status(&widget.handle, |s| s.state == CharacterState::Talking).await;
    let talking_since = tokio::time::Instant::now();

    let status = wait_for_status(&widget.handle, |s| {
        s.state == CharacterState::Idle && !s.speaking
    })
    .await;
    assert!(!status.speaking);
    assert!(talking_since.elapsed() <= Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn force_reset_restores_known_good_state() {
    let widget = spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));

    widget.handle.set_microphone(true).unwrap();
    widget.handle.start(false).unwrap();
    let status = wait_for_status(&widget.handle, |s| s.speaking).await;
    assert_eq!(status.recognition, RecognitionSessionState::Stopping);

    widget.handle.force_reset().unwrap();
    let status = widget.handle.status().await.unwrap();
    assert_eq!(status.state, CharacterState::Idle);
    assert!(!status.speaking);
    assert_eq!(status.recognition, RecognitionSessionState::Stopped);
    assert_eq!(widget.input.aborts(), 1);

    let reset_at = tokio::time::Instant::now();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;
    assert!(reset_at.elapsed() >= Duration::from_millis(500));
    assert_eq!(widget.input.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn recovery_shortcut_triggers_reset() {
    let widget = spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));
    widget.handle.start(false).unwrap();
    wait_for_status(&widget.handle, |s| s.speaking).await;

    widget
        .handle
        .key_press(KeyPress {
            key: "R".into(),
            ctrl: true,
            shift: true,
            ..KeyPress::default()
        })
        .unwrap();
    let status = widget.handle.status().await.unwrap();
    assert_eq!(status.state, CharacterState::Idle);
    assert!(!status.speaking);
}

#[tokio::test(start_paused = true)]
async fn stale_end_from_cancelled_utterance_is_ignored() {
    let widget = spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));

    widget.handle.start(false).unwrap();
    wait_for_status(&widget.handle, |s| s.speaking).await;
    let first = widget.spoken.last().id;

    widget.handle.force_reset().unwrap();
    widget.handle.start(false).unwrap();
    wait_for_status(&widget.handle, |s| s.speaking).await;
    assert_ne!(widget.spoken.last().id, first);

    widget
        .handle
        .events()
        .speech_output(SpeechOutputEvent::new(first, SpeechOutputEventKind::Ended));
    let status = widget.handle.status().await.unwrap();
    assert_eq!(status.state, CharacterState::Talking);
    assert!(status.speaking);
}

#[tokio::test(start_paused = true)]
async fn denied_microphone_turns_affordance_off_with_notice() {
    let mut widget =
        spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));
    widget.handle.set_microphone(true).unwrap();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;
    drain_events(&mut widget.runtime);

    widget.input.fail(RecognitionErrorKind::NotAllowed);
    let status = widget.handle.status().await.unwrap();
    assert!(!status.microphone_intent);
    assert_eq!(status.recognition, RecognitionSessionState::Stopped);

    let events = drain_events(&mut widget.runtime);
    assert!(events.contains(&RuntimeEvent::MicrophoneChanged { active: false }));
    assert!(events.iter().any(|e| matches!(e, RuntimeEvent::Notice { .. })));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(widget.input.starts(), 1, "no retry after a fatal error");
}

#[tokio::test(start_paused = true)]
async fn network_error_retries_after_backoff() {
    let widget = spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));
    widget.handle.set_microphone(true).unwrap();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;

    widget.input.fail(RecognitionErrorKind::Network);
    let failed_at = tokio::time::Instant::now();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;
    assert!(failed_at.elapsed() >= Duration::from_secs(2));
    assert_eq!(widget.input.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn no_speech_timeout_just_restarts() {
    let mut widget =
        spawn_widget(&WidgetConfig::default(), Arc::new(ScriptedGateway::default()));
    widget.handle.set_microphone(true).unwrap();
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active
    })
    .await;

    widget.input.fail(RecognitionErrorKind::NoSpeech);
    wait_for_status(&widget.handle, |s| {
        s.recognition == RecognitionSessionState::Active && s.microphone_intent
    })
    .await;
    assert_eq!(widget.input.starts(), 2);
    let events = drain_events(&mut widget.runtime);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, RuntimeEvent::Message(m) if m.author == MessageAuthor::User))
    );
}
