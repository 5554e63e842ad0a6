//! Best-effort voice selection.
//!
//! Platforms expose wildly different voice lists (and some expose none until
//! an async "voices changed" callback). Selection is a pure function over
//! whatever list the output channel reports, with a fixed fallback order:
//!
//! 1. voices whose locale equals the target locale,
//! 2. voices sharing the target's primary language subtag,
//! 3. the first voice available.
//!
//! Inside tiers 1 and 2 a voice of the persona's gender wins, then a voice
//! whose name contains the configured hint, then list order.

use serde::{Deserialize, Serialize};

/// Gender flag reported for (or inferred from) a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
    /// Not reported / no preference.
    #[default]
    Unspecified,
}

impl VoiceGender {
    /// Infer a gender flag from a platform voice name
    /// (e.g. "Microsoft Pavel - Russian (Male)").
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("female") {
            VoiceGender::Female
        } else if lower.contains("male") {
            VoiceGender::Male
        } else {
            VoiceGender::Unspecified
        }
    }
}

/// A voice offered by the speech output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    /// BCP-47 tag, e.g. `ru-RU`.
    pub lang: String,
    pub gender: VoiceGender,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        let name = name.into();
        let gender = VoiceGender::infer_from_name(&name);
        Self {
            name,
            lang: lang.into(),
            gender,
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = gender;
        self
    }
}

/// What the persona would like to sound like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePreferences {
    pub lang: String,
    pub gender: VoiceGender,
    pub name_hint: Option<String>,
}

fn normalize_lang(lang: &str) -> String {
    lang.trim().replace('_', "-").to_lowercase()
}

fn primary_subtag(lang: &str) -> &str {
    lang.split('-').next().unwrap_or(lang)
}

/// Pick a voice for `prefs` from `voices`. Returns `None` only for an empty list.
pub fn select_voice<'a>(voices: &'a [VoiceInfo], prefs: &VoicePreferences) -> Option<&'a VoiceInfo> {
    let target = normalize_lang(&prefs.lang);
    let target_primary = primary_subtag(&target).to_owned();

    let exact: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| normalize_lang(&v.lang) == target)
        .collect();
    if let Some(best) = best_ranked(&exact, prefs) {
        return Some(best);
    }

    let same_language: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| primary_subtag(&normalize_lang(&v.lang)) == target_primary)
        .collect();
    if let Some(best) = best_ranked(&same_language, prefs) {
        return Some(best);
    }

    voices.first()
}

fn best_ranked<'a>(candidates: &[&'a VoiceInfo], prefs: &VoicePreferences) -> Option<&'a VoiceInfo> {
    let hint = prefs.name_hint.as_deref().map(str::to_lowercase);
    let rank = |voice: &VoiceInfo| {
        let gender_match =
            prefs.gender != VoiceGender::Unspecified && voice.gender == prefs.gender;
        let hint_match = hint
            .as_deref()
            .is_some_and(|h| !h.is_empty() && voice.name.to_lowercase().contains(h));
        (gender_match, hint_match)
    };

    let mut best: Option<&'a VoiceInfo> = None;
    for &candidate in candidates {
        match best {
            // Strictly greater keeps the earliest voice on ties.
            Some(current) if rank(candidate) <= rank(current) => {}
            _ => best = Some(candidate),
        }
    }
    best
}
