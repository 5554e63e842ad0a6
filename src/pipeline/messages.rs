//! Message types passed into the coordinator loop.

use crate::character::CharacterState;
use crate::character::media::ReadyState;
use crate::error::{Result, WidgetError};
use crate::shortcut::KeyPress;
use crate::speech::input::{RecognitionEvent, RecognitionSessionState};
use crate::speech::output::SpeechOutputEvent;
use serde::Serialize;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Identifier of one in-flight backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A video source changed readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaEvent {
    pub state: CharacterState,
    pub level: ReadyState,
}

/// Outcome of a backend request, delivered back to the loop.
#[derive(Debug)]
pub struct BackendReply {
    pub request: RequestId,
    pub result: Result<String>,
}

/// Point-in-time snapshot of the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetStatus {
    pub state: CharacterState,
    pub speaking: bool,
    pub recognition: RecognitionSessionState,
    pub microphone_intent: bool,
    pub recognition_available: bool,
    pub textures_ready: bool,
    pub pending_requests: usize,
}

/// Requests from the UI layer.
#[derive(Debug)]
pub enum Command {
    /// Typed user message.
    SubmitText(String),
    SetMicrophone(bool),
    ToggleMicrophone,
    /// Manual full recovery.
    ForceReset,
    /// Raw key press; matched against the recovery chord.
    KeyPress(KeyPress),
    /// The start overlay was dismissed.
    Start { enable_microphone: bool },
    Status(oneshot::Sender<WidgetStatus>),
}

/// Everything the coordinator reacts to, besides its own timers.
#[derive(Debug)]
pub enum WidgetEvent {
    Command(Command),
    SpeechOutput(SpeechOutputEvent),
    Recognition(RecognitionEvent),
    Media(MediaEvent),
    BackendReply(BackendReply),
}

/// Cloneable sender collaborators use to report back to the loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<WidgetEvent>,
}

/// Receiving half, owned by the coordinator.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<WidgetEvent>,
}

/// Create the coordinator's inbound event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Send an event.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Channel`] once the coordinator has stopped.
    pub fn send(&self, event: WidgetEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| WidgetError::Channel("widget loop is not running".into()))
    }

    pub fn command(&self, command: Command) -> Result<()> {
        self.send(WidgetEvent::Command(command))
    }

    /// Report a speech output event. Dropped silently after shutdown.
    pub fn speech_output(&self, event: SpeechOutputEvent) {
        let _ = self.send(WidgetEvent::SpeechOutput(event));
    }

    /// Report a recognition event. Dropped silently after shutdown.
    pub fn recognition(&self, event: RecognitionEvent) {
        let _ = self.send(WidgetEvent::Recognition(event));
    }

    /// Report media readiness. Dropped silently after shutdown.
    pub fn media(&self, state: CharacterState, level: ReadyState) {
        let _ = self.send(WidgetEvent::Media(MediaEvent { state, level }));
    }

    pub(crate) fn backend_reply(&self, reply: BackendReply) {
        let _ = self.send(WidgetEvent::BackendReply(reply));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<WidgetEvent> {
        self.rx.recv().await
    }
}
