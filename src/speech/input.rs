//! Speech recognition channel.
//!
//! Sessions are single-shot: a session ends after one result or after a
//! silence timeout, and continuous listening means starting a new session
//! each time the previous one ends. Every session is stamped with a
//! [`RecognitionSessionId`] chosen by the controller; adapters must tag the
//! events they emit with the id of the session that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one recognition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecognitionSessionId(pub u64);

impl fmt::Display for RecognitionSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Tracked state of the recognition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionSessionState {
    #[default]
    Stopped,
    Starting,
    Active,
    /// Stop requested; waiting for the end notification.
    Stopping,
}

/// Error kinds reported by the recognition engine, mirroring the Web Speech
/// API's `SpeechRecognitionErrorEvent.error` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    BadGrammar,
    LanguageNotSupported,
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse the platform's error code.
    pub fn parse(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "bad-grammar" => Self::BadGrammar,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Errors that make continuous listening impossible until the user acts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AudioCapture | Self::NotAllowed | Self::ServiceNotAllowed
        )
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::BadGrammar => "bad-grammar",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(code) => code,
        };
        f.write_str(code)
    }
}

/// Synchronous failure of the start primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    /// The engine still considers a previous session running.
    #[error("recognition already started")]
    AlreadyStarted,
    /// Microphone permission denied.
    #[error("microphone permission denied")]
    NotAllowed,
    /// No usable capture device.
    #[error("audio capture unavailable")]
    AudioCapture,
    #[error("recognition start failed: {0}")]
    Other(String),
}

impl StartError {
    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StartError::AlreadyStarted => "already_started",
            StartError::NotAllowed => "not_allowed",
            StartError::AudioCapture => "audio_capture",
            StartError::Other(_) => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEventKind {
    /// Final transcript of the session (single alternative).
    Result { transcript: String },
    Error(RecognitionErrorKind),
    /// The session is over; always follows results and errors.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub session: RecognitionSessionId,
    pub kind: RecognitionEventKind,
}

impl RecognitionEvent {
    pub fn new(session: RecognitionSessionId, kind: RecognitionEventKind) -> Self {
        Self { session, kind }
    }
}

/// A speech-to-text engine.
pub trait SpeechInput: Send {
    /// Begin a new session.
    ///
    /// # Errors
    ///
    /// Returns a [`StartError`] when the engine refuses synchronously.
    fn start(&mut self, session: RecognitionSessionId) -> Result<(), StartError>;

    /// Graceful stop; the engine reports `End` when done.
    fn stop(&mut self);

    /// Immediate stop. Any later events for the aborted session are stale.
    fn abort(&mut self);
}
