//! Routes host command envelopes to the running widget.

use crate::host::console::HeardInjector;
use crate::host::contract::{
    CommandEnvelope, CommandName, MicrophoneSetPayload, ResponseEnvelope, SendTextPayload,
    SpeechHeardPayload, StartPayload,
};
use crate::pipeline::coordinator::WidgetHandle;
use crate::shortcut::KeyPress;
use serde_json::json;
use tracing::{info, warn};

/// Command router between the host protocol and a [`WidgetHandle`].
#[derive(Clone)]
pub struct HostBridge {
    widget: WidgetHandle,
    heard: Option<HeardInjector>,
}

impl HostBridge {
    /// `heard` is `None` when recognition is not available to the host.
    pub fn new(widget: WidgetHandle, heard: Option<HeardInjector>) -> Self {
        Self { widget, heard }
    }

    pub fn widget(&self) -> &WidgetHandle {
        &self.widget
    }

    /// Handle one envelope. Never fails: problems become error responses.
    pub async fn dispatch(&self, envelope: CommandEnvelope) -> ResponseEnvelope {
        if let Err(e) = envelope.validate() {
            warn!(request_id = %envelope.request_id, "rejected envelope: {e}");
            return ResponseEnvelope::error(envelope.request_id, e.to_string());
        }
        let request_id = envelope.request_id.clone();
        match self.route(&envelope).await {
            Ok(payload) => ResponseEnvelope::ok(request_id, payload),
            Err(message) => {
                warn!(request_id = %request_id, command = envelope.command.as_str(), "command failed: {message}");
                ResponseEnvelope::error(request_id, message)
            }
        }
    }

    async fn route(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value, String> {
        let widget = &self.widget;
        match envelope.command {
            CommandName::HostPing => Ok(json!({ "pong": true })),
            CommandName::WidgetStart => {
                let payload: StartPayload = envelope.payload_as().map_err(|e| e.to_string())?;
                widget
                    .start(payload.enable_microphone)
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "started": true }))
            }
            CommandName::WidgetStatus => {
                let status = widget.status().await.map_err(|e| e.to_string())?;
                serde_json::to_value(status).map_err(|e| e.to_string())
            }
            CommandName::ConversationSendText => {
                let payload: SendTextPayload = envelope.payload_as().map_err(|e| e.to_string())?;
                if payload.text.trim().is_empty() {
                    return Err("text must not be empty".to_owned());
                }
                widget.submit_text(payload.text).map_err(|e| e.to_string())?;
                Ok(json!({ "accepted": true }))
            }
            CommandName::MicrophoneSet => {
                let payload: MicrophoneSetPayload =
                    envelope.payload_as().map_err(|e| e.to_string())?;
                widget
                    .set_microphone(payload.enabled)
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "requested": payload.enabled }))
            }
            CommandName::MicrophoneToggle => {
                widget.toggle_microphone().map_err(|e| e.to_string())?;
                Ok(json!({ "toggled": true }))
            }
            CommandName::SpeechHeard => {
                let payload: SpeechHeardPayload =
                    envelope.payload_as().map_err(|e| e.to_string())?;
                let Some(heard) = &self.heard else {
                    return Err("speech recognition is not available".to_owned());
                };
                Ok(json!({ "delivered": heard.hear(&payload.transcript) }))
            }
            CommandName::KeyPress => {
                let press: KeyPress = envelope.payload_as().map_err(|e| e.to_string())?;
                widget.key_press(press).map_err(|e| e.to_string())?;
                Ok(json!({ "handled": true }))
            }
            CommandName::AvatarReset => {
                widget.force_reset().map_err(|e| e.to_string())?;
                Ok(json!({ "reset": true }))
            }
            CommandName::RuntimeStop => {
                info!("stop requested by host");
                widget.shutdown();
                Ok(json!({ "stopping": true }))
            }
        }
    }
}
