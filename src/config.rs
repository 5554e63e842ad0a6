//! Configuration types for the avatar widget.

use crate::character::{AnimationBinding, CharacterState};
use crate::shortcut::KeyChord;
use crate::speech::voice::{VoiceGender, VoicePreferences};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Text-to-speech settings.
    pub speech: SpeechOutputConfig,
    /// Speech recognition settings.
    pub recognition: RecognitionConfig,
    /// Watchdogs, cooldowns, restart delays and backoffs.
    pub timing: TimingConfig,
    /// Clip bindings per character state.
    pub animation: AnimationConfig,
    /// Conversational backend settings.
    pub backend: BackendConfig,
    /// Session identifier persistence.
    pub session: SessionConfig,
    /// Start overlay, greeting and shortcuts.
    pub ui: UiConfig,
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOutputConfig {
    /// BCP-47 language tag for utterances.
    pub lang: String,
    /// Speaking rate (1.0 = platform default).
    pub rate: f32,
    /// Voice pitch (1.0 = platform default).
    pub pitch: f32,
    /// Gender of the persona; used to break ties between voices of the same locale.
    pub persona_gender: VoiceGender,
    /// Optional substring preferred in the voice name (e.g. `"Google"`).
    pub voice_name_hint: Option<String>,
}

impl Default for SpeechOutputConfig {
    fn default() -> Self {
        Self {
            lang: "ru-RU".to_owned(),
            rate: 1.4,
            pitch: 1.5,
            persona_gender: VoiceGender::Male,
            voice_name_hint: Some("Google".to_owned()),
        }
    }
}

impl SpeechOutputConfig {
    /// Voice selection preferences derived from this config.
    pub fn voice_preferences(&self) -> VoicePreferences {
        VoicePreferences {
            lang: self.lang.clone(),
            gender: self.persona_gender,
            name_hint: self.voice_name_hint.clone(),
        }
    }
}

/// Speech recognition configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// BCP-47 language tag for recognition.
    pub lang: String,
    /// Continuous mode. Sessions are single-shot when false.
    pub continuous: bool,
    /// Whether interim (partial) results are delivered.
    pub interim_results: bool,
    /// Number of alternative transcripts per result.
    pub max_alternatives: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            lang: "ru-RU".to_owned(),
            continuous: false,
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

/// Timer configuration.
///
/// None of these values is load-bearing; they trade responsiveness against
/// platform "already started/stopping" races and echo capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay after speech ends before the speaking flag clears (echo tail).
    pub speech_cooldown_ms: u64,
    /// Delay after the cooldown before recognition is re-armed.
    pub post_speech_restart_ms: u64,
    /// Delay between a recognition session ending and the next start.
    pub recognition_restart_ms: u64,
    /// Backoff after a recognition network error.
    pub network_backoff_ms: u64,
    /// Delay before recognition restarts after a forced reset.
    pub force_reset_restart_ms: u64,
    /// Minimum speech watchdog duration.
    pub watchdog_floor_ms: u64,
    /// Watchdog budget per character of utterance text.
    pub watchdog_per_char_ms: u64,
    /// Maximum gap between speech progress events before speech is treated as stalled.
    pub stall_window_ms: u64,
    /// Delay after the greeting before the microphone is armed (start overlay opt-in).
    pub greeting_mic_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            speech_cooldown_ms: 500,
            post_speech_restart_ms: 300,
            recognition_restart_ms: 400,
            network_backoff_ms: 2_000,
            force_reset_restart_ms: 500,
            watchdog_floor_ms: 20_000,
            watchdog_per_char_ms: 100,
            stall_window_ms: 5_000,
            greeting_mic_delay_ms: 1_500,
        }
    }
}

impl TimingConfig {
    pub fn speech_cooldown(&self) -> Duration {
        Duration::from_millis(self.speech_cooldown_ms)
    }

    pub fn post_speech_restart(&self) -> Duration {
        Duration::from_millis(self.post_speech_restart_ms)
    }

    pub fn recognition_restart(&self) -> Duration {
        Duration::from_millis(self.recognition_restart_ms)
    }

    pub fn network_backoff(&self) -> Duration {
        Duration::from_millis(self.network_backoff_ms)
    }

    pub fn force_reset_restart(&self) -> Duration {
        Duration::from_millis(self.force_reset_restart_ms)
    }

    pub fn stall_window(&self) -> Duration {
        Duration::from_millis(self.stall_window_ms)
    }

    pub fn greeting_mic_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_mic_delay_ms)
    }

    /// Watchdog duration for an utterance: proportional to its length, never
    /// below the floor.
    pub fn watchdog_for(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        let scaled = chars.saturating_mul(self.watchdog_per_char_ms);
        Duration::from_millis(scaled.max(self.watchdog_floor_ms))
    }
}

/// Animation clip bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub idle: AnimationBinding,
    pub thinking: AnimationBinding,
    pub talking: AnimationBinding,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            idle: AnimationBinding::new("Idle", 0.2),
            thinking: AnimationBinding::new("Thinking", 0.2),
            talking: AnimationBinding::new("Talking", 0.2),
        }
    }
}

impl AnimationConfig {
    /// Binding for a character state.
    pub fn binding(&self, state: CharacterState) -> &AnimationBinding {
        match state {
            CharacterState::Idle => &self.idle,
            CharacterState::Thinking => &self.thinking,
            CharacterState::Talking => &self.talking,
        }
    }
}

/// Conversational backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Webhook endpoint receiving `{message, sessionId}` POSTs.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Bot message shown when the backend fails.
    pub fallback_message: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://n8n-system.onrender.com/webhook/chatbot-webhook".to_owned(),
            timeout_secs: 30,
            fallback_message: "Извините, произошла ошибка. Попробуйте ещё раз.".to_owned(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session identifier persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path of the key-value store. `None` uses `data_dir()/session.json`.
    pub store_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Resolved store path.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(crate::invader_dirs::session_store_file)
    }
}

/// Start overlay and keyboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Greeting spoken when the widget starts. Empty disables the greeting.
    pub greeting: String,
    /// Key chord that triggers a full recovery.
    pub force_reset_shortcut: KeyChord,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            greeting: "Привет! Я виртуальный помощник. Чем могу помочь?".to_owned(),
            force_reset_shortcut: KeyChord::ctrl_shift('r'),
        }
    }
}

impl WidgetConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::WidgetError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::WidgetError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::invader_dirs::config_file()
    }
}
