//! Key chords for the manual recovery action.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A key press reported by the host UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPress {
    /// `KeyboardEvent.key` value, e.g. `"R"` or `"Escape"`.
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

/// A modifier + key combination, written as `Ctrl+Shift+R`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyChord {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    /// Lowercased key name.
    pub key: String,
}

impl KeyChord {
    pub fn ctrl_shift(key: char) -> Self {
        Self {
            ctrl: true,
            shift: true,
            alt: false,
            meta: false,
            key: key.to_lowercase().collect(),
        }
    }

    /// Whether `press` is exactly this chord (no extra modifiers).
    pub fn matches(&self, press: &KeyPress) -> bool {
        self.ctrl == press.ctrl
            && self.shift == press.shift
            && self.alt == press.alt
            && self.meta == press.meta
            && self.key == press.key.to_lowercase()
    }
}

/// Chord parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyChordError {
    #[error("key chord is empty")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("key chord `{0}` names no key")]
    MissingKey(String),
}

impl FromStr for KeyChord {
    type Err = KeyChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        if parts.iter().all(|p| p.is_empty()) {
            return Err(KeyChordError::Empty);
        }
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(KeyChordError::Empty);
        };
        if key.is_empty() {
            return Err(KeyChordError::MissingKey(s.to_owned()));
        }

        let mut chord = KeyChord {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            key: key.to_lowercase(),
        };
        for modifier in modifiers {
            match modifier.to_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                other => return Err(KeyChordError::UnknownModifier(other.to_owned())),
            }
        }
        Ok(chord)
    }
}

impl TryFrom<String> for KeyChord {
    type Error = KeyChordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyChord> for String {
    fn from(chord: KeyChord) -> Self {
        chord.to_string()
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.meta {
            f.write_str("Meta+")?;
        }
        if self.key.chars().count() == 1 {
            f.write_str(&self.key.to_uppercase())
        } else {
            f.write_str(&self.key)
        }
    }
}
