//! Error types for the avatar widget core.

/// Top-level error type for the widget.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Conversational backend (webhook) error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Session identifier storage error.
    #[error("session error: {0}")]
    Session(String),

    /// Speech output (text-to-speech) error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Speech recognition error.
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Render service error (clips, textures).
    #[error("render error: {0}")]
    Render(String),

    /// Video media resource error.
    #[error("media error: {0}")]
    Media(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WidgetError>;
