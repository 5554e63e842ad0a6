//! Versioned host command/event envelopes for embedding the widget core.

use crate::runtime::RuntimeEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Command set understood by the host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "widget.start")]
    WidgetStart,
    #[serde(rename = "widget.status")]
    WidgetStatus,
    #[serde(rename = "conversation.send_text")]
    ConversationSendText,
    #[serde(rename = "microphone.set")]
    MicrophoneSet,
    #[serde(rename = "microphone.toggle")]
    MicrophoneToggle,
    #[serde(rename = "speech.heard")]
    SpeechHeard,
    #[serde(rename = "key.press")]
    KeyPress,
    #[serde(rename = "avatar.reset")]
    AvatarReset,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::WidgetStart => "widget.start",
            Self::WidgetStatus => "widget.status",
            Self::ConversationSendText => "conversation.send_text",
            Self::MicrophoneSet => "microphone.set",
            Self::MicrophoneToggle => "microphone.toggle",
            Self::SpeechHeard => "speech.heard",
            Self::KeyPress => "key.press",
            Self::AvatarReset => "avatar.reset",
            Self::RuntimeStop => "runtime.stop",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host.ping" => Some(Self::HostPing),
            "widget.start" => Some(Self::WidgetStart),
            "widget.status" => Some(Self::WidgetStatus),
            "conversation.send_text" => Some(Self::ConversationSendText),
            "microphone.set" => Some(Self::MicrophoneSet),
            "microphone.toggle" => Some(Self::MicrophoneToggle),
            "speech.heard" => Some(Self::SpeechHeard),
            "key.press" => Some(Self::KeyPress),
            "avatar.reset" => Some(Self::AvatarReset),
            "runtime.stop" => Some(Self::RuntimeStop),
            _ => None,
        }
    }
}

/// A versioned response envelope from the bridge to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from the host to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Decode the payload into a command-specific shape.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, ContractError> {
        let raw = if self.payload.is_null() {
            json!({})
        } else {
            self.payload.clone()
        };
        serde_json::from_value(raw).map_err(|e| {
            ContractError::new(
                ContractErrorKind::InvalidPayload,
                format!("invalid payload for {}: {e}", self.command.as_str()),
            )
        })
    }
}

/// A versioned event envelope from the bridge to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }

    /// Wrap a runtime event; `seq` numbers events within one bridge run.
    #[must_use]
    pub fn from_runtime(seq: u64, event: &RuntimeEvent) -> Self {
        let payload = match event {
            RuntimeEvent::Message(message) => json!({
                "author": message.author.as_str(),
                "text": message.text,
                "at": message.at.to_rfc3339(),
            }),
            RuntimeEvent::Notice { text } => json!({ "text": text }),
            RuntimeEvent::MicrophoneChanged { active } => json!({ "active": active }),
            RuntimeEvent::StateChanged { state } => json!({ "state": state.as_str() }),
            RuntimeEvent::SpeakingChanged { speaking } => json!({ "speaking": speaking }),
        };
        Self::new(format!("evt-{seq}"), event.name(), payload)
    }
}

/// Payload of `widget.start`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartPayload {
    pub enable_microphone: bool,
}

/// Payload of `conversation.send_text`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendTextPayload {
    pub text: String,
}

/// Payload of `microphone.set`.
#[derive(Debug, Clone, Deserialize)]
pub struct MicrophoneSetPayload {
    pub enabled: bool,
}

/// Payload of `speech.heard`: a transcript for the active recognition session.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechHeardPayload {
    pub transcript: String,
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
    InvalidPayload,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
