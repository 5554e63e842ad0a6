//! Runtime events emitted for the UI layer and observability.
//!
//! This is intentionally lightweight (no heavy payloads) so the event loop
//! can emit events without ever waiting on a slow subscriber.

use crate::character::CharacterState;
use chrono::{DateTime, Utc};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAuthor {
    User,
    Bot,
}

impl MessageAuthor {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageAuthor::User => "user",
            MessageAuthor::Bot => "bot",
        }
    }
}

/// A message appended to the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: MessageAuthor,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(author: MessageAuthor, text: impl Into<String>) -> Self {
        Self {
            author,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Events that describe what the widget is doing "right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A message to append to the chat list.
    Message(ChatMessage),
    /// One-line user-visible explanation (degraded capability, permission denied).
    Notice { text: String },
    /// Microphone affordance should show on/off.
    MicrophoneChanged { active: bool },
    /// The avatar's facial state changed (or was re-applied).
    StateChanged { state: CharacterState },
    /// The bot started or fully finished speaking (including the cooldown).
    SpeakingChanged { speaking: bool },
}

impl RuntimeEvent {
    /// Wire name used by the host bridge.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::Message(_) => "chat.message",
            RuntimeEvent::Notice { .. } => "widget.notice",
            RuntimeEvent::MicrophoneChanged { .. } => "microphone.changed",
            RuntimeEvent::StateChanged { .. } => "avatar.state",
            RuntimeEvent::SpeakingChanged { .. } => "speech.speaking",
        }
    }
}
