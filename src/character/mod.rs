//! Character facial state and its animation bindings.
//!
//! The avatar shows exactly one of three states at a time. Each state owns a
//! looping eye video (bound to the face material as a texture) and a named
//! skeletal clip that is cross-faded in when the state becomes active.

pub mod media;
pub mod render;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What the avatar is visibly doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterState {
    /// Waiting for input.
    #[default]
    Idle,
    /// A request is in flight to the backend.
    Thinking,
    /// The bot's reply is being spoken.
    Talking,
}

impl CharacterState {
    /// All states in a fixed order.
    pub const ALL: [CharacterState; 3] = [
        CharacterState::Idle,
        CharacterState::Thinking,
        CharacterState::Talking,
    ];

    /// Stable lowercase name, used for media ids and events.
    pub fn as_str(self) -> &'static str {
        match self {
            CharacterState::Idle => "idle",
            CharacterState::Thinking => "thinking",
            CharacterState::Talking => "talking",
        }
    }

    /// Index into per-state arrays.
    pub(crate) fn index(self) -> usize {
        match self {
            CharacterState::Idle => 0,
            CharacterState::Thinking => 1,
            CharacterState::Talking => 2,
        }
    }
}

impl fmt::Display for CharacterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest cross-fade the render service is asked for.
pub const MAX_CROSS_FADE_SECS: f32 = 10.0;

/// Static association between a state and a skeletal clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationBinding {
    /// Clip name as exported in the model file.
    pub clip: String,
    /// Blend duration in seconds.
    pub cross_fade_secs: f32,
}

impl AnimationBinding {
    pub fn new(clip: impl Into<String>, cross_fade_secs: f32) -> Self {
        Self {
            clip: clip.into(),
            cross_fade_secs,
        }
    }

    /// Blend duration, clamped to `0..=MAX_CROSS_FADE_SECS`. NaN counts as 0.
    pub fn cross_fade(&self) -> Duration {
        let secs = self.cross_fade_secs.max(0.0).min(MAX_CROSS_FADE_SECS);
        Duration::from_secs_f32(secs)
    }
}
