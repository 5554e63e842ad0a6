//! Event loop wiring the controller and the conversation together.
//!
//! One task owns all widget state. It multiplexes the inbound event channel,
//! the controller's timers and a cancellation token; each event is handled
//! to completion before the next is looked at.

use crate::config::WidgetConfig;
use crate::error::{Result, WidgetError};
use crate::gateway::BackendGateway;
use crate::pipeline::controller::{CharacterController, ControllerParts};
use crate::pipeline::messages::{Command, EventReceiver, EventSender, WidgetEvent, WidgetStatus};
use crate::pipeline::orchestrator::Conversation;
use crate::runtime::RuntimeEvent;
use crate::shortcut::{KeyChord, KeyPress};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runtime event fan-out capacity. Slow subscribers lag rather than block.
const RUNTIME_EVENT_CAPACITY: usize = 256;

pub struct WidgetCoordinator {
    controller: CharacterController,
    conversation: Conversation,
    events: EventSender,
    events_rx: EventReceiver,
    runtime_tx: broadcast::Sender<RuntimeEvent>,
    force_reset_chord: KeyChord,
    greeting: String,
    cancel: CancellationToken,
}

impl WidgetCoordinator {
    /// Build the coordinator around an event channel created with
    /// [`event_channel`](crate::pipeline::messages::event_channel), whose
    /// sender the collaborators in `parts` already hold.
    pub fn new(
        config: &WidgetConfig,
        parts: ControllerParts,
        gateway: Arc<dyn BackendGateway>,
        events: EventSender,
        events_rx: EventReceiver,
    ) -> Self {
        let (runtime_tx, _) = broadcast::channel(RUNTIME_EVENT_CAPACITY);
        let controller = CharacterController::new(config, parts, runtime_tx.clone());
        let conversation = Conversation::new(
            gateway,
            config.backend.fallback_message.clone(),
            events.clone(),
            runtime_tx.clone(),
        );
        Self {
            controller,
            conversation,
            events,
            events_rx,
            runtime_tx,
            force_reset_chord: config.ui.force_reset_shortcut.clone(),
            greeting: config.ui.greeting.clone(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> WidgetHandle {
        WidgetHandle {
            events: self.events.clone(),
            runtime_tx: self.runtime_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> (WidgetHandle, JoinHandle<()>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run());
        (handle, task)
    }

    /// Run until the handle's [`WidgetHandle::shutdown`] is called.
    pub async fn run(mut self) {
        info!("widget loop started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                action = self.controller.next_timer() => self.controller.on_timer(action),
            }
        }
        self.controller.shutdown();
        info!("widget loop stopped");
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Command(command) => self.handle_command(command),
            WidgetEvent::SpeechOutput(event) => self.controller.on_speech_event(event),
            WidgetEvent::Recognition(event) => {
                if let Some(transcript) = self.controller.on_recognition_event(event) {
                    self.conversation.submit(&mut self.controller, &transcript);
                }
            }
            WidgetEvent::Media(event) => self.controller.on_media_ready(event.state, event.level),
            WidgetEvent::BackendReply(reply) => {
                self.conversation.on_reply(&mut self.controller, reply);
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SubmitText(text) => {
                self.conversation.submit(&mut self.controller, &text);
            }
            Command::SetMicrophone(enabled) => {
                self.controller.set_microphone_intent(enabled);
            }
            Command::ToggleMicrophone => {
                self.controller.toggle_microphone();
            }
            Command::ForceReset => self.controller.force_reset_all(),
            Command::KeyPress(press) => {
                if self.force_reset_chord.matches(&press) {
                    info!(chord = %self.force_reset_chord, "recovery shortcut pressed");
                    self.controller.force_reset_all();
                } else {
                    debug!(key = %press.key, "unbound key press");
                }
            }
            Command::Start { enable_microphone } => {
                info!(enable_microphone, "widget started");
                self.conversation.greet(&mut self.controller, &self.greeting);
                if enable_microphone {
                    self.controller.arm_microphone_later();
                }
            }
            Command::Status(reply) => {
                let status = self.controller.status(self.conversation.pending_requests());
                let _ = reply.send(status);
            }
        }
    }
}

/// Cloneable front door to a running widget loop.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    events: EventSender,
    runtime_tx: broadcast::Sender<RuntimeEvent>,
    cancel: CancellationToken,
}

impl WidgetHandle {
    /// Subscribe to UI-facing runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.runtime_tx.subscribe()
    }

    /// Sender for collaborator callbacks (speech, recognition, media).
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn submit_text(&self, text: impl Into<String>) -> Result<()> {
        self.events.command(Command::SubmitText(text.into()))
    }

    pub fn set_microphone(&self, enabled: bool) -> Result<()> {
        self.events.command(Command::SetMicrophone(enabled))
    }

    pub fn toggle_microphone(&self) -> Result<()> {
        self.events.command(Command::ToggleMicrophone)
    }

    pub fn force_reset(&self) -> Result<()> {
        self.events.command(Command::ForceReset)
    }

    pub fn key_press(&self, press: KeyPress) -> Result<()> {
        self.events.command(Command::KeyPress(press))
    }

    /// Dismiss the start overlay: greet, and optionally arm the microphone.
    pub fn start(&self, enable_microphone: bool) -> Result<()> {
        self.events.command(Command::Start { enable_microphone })
    }

    /// Snapshot of the widget once every previously sent event is handled.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetError::Channel`] if the loop has stopped.
    pub async fn status(&self) -> Result<WidgetStatus> {
        let (tx, rx) = oneshot::channel();
        self.events.command(Command::Status(tx))?;
        rx.await
            .map_err(|_| WidgetError::Channel("widget loop dropped status request".into()))
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
