//! Speech output (text-to-speech) and speech input (recognition) seams.
//!
//! Both channels are platform services that report their progress through
//! events rather than return values, and both are known to drop events under
//! load. The types here stamp every event with the utterance or session it
//! belongs to so the controller can discard anything stale.

pub mod input;
pub mod output;
pub mod voice;

pub use input::{
    RecognitionErrorKind, RecognitionEvent, RecognitionEventKind, RecognitionSessionId,
    RecognitionSessionState, SpeechInput, StartError,
};
pub use output::{SpeechOutput, SpeechOutputEvent, SpeechOutputEventKind, Utterance, UtteranceId};
pub use voice::{VoiceGender, VoiceInfo, VoicePreferences, select_voice};
