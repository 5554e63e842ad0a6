//! Text-to-speech channel.

use crate::error::Result;
use crate::speech::voice::VoiceInfo;
use std::fmt;

/// Identifier of one submitted utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

/// A request to speak `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    /// `None` leaves the choice to the platform default.
    pub voice: Option<VoiceInfo>,
}

/// Lifecycle notifications from the output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutputEventKind {
    /// Audio started.
    Started,
    /// Progress through the text (word boundary).
    Boundary { char_index: usize },
    /// Audio finished normally.
    Ended,
    /// The engine gave up (including "interrupted"/"canceled").
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOutputEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechOutputEventKind,
}

impl SpeechOutputEvent {
    pub fn new(utterance: UtteranceId, kind: SpeechOutputEventKind) -> Self {
        Self { utterance, kind }
    }
}

/// A text-to-speech engine.
///
/// `speak` only queues the utterance; progress is reported asynchronously as
/// [`SpeechOutputEvent`]s tagged with the utterance id. Engines are allowed
/// to report nothing at all: the controller has its own watchdog.
pub trait SpeechOutput: Send {
    /// Voices currently offered by the engine. May be empty.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Queue an utterance.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the request outright.
    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    /// Drop the current utterance and anything queued behind it.
    fn cancel(&mut self);
}
