//! Conversation orchestrator: user text in, spoken reply out.

use crate::character::CharacterState;
use crate::gateway::BackendGateway;
use crate::pipeline::controller::CharacterController;
use crate::pipeline::messages::{BackendReply, EventSender, RequestId};
use crate::runtime::{ChatMessage, MessageAuthor, RuntimeEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

pub struct Conversation {
    gateway: Arc<dyn BackendGateway>,
    fallback_message: String,
    events: EventSender,
    runtime_tx: broadcast::Sender<RuntimeEvent>,
    next_request: u64,
    in_flight: HashSet<RequestId>,
}

impl Conversation {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        fallback_message: impl Into<String>,
        events: EventSender,
        runtime_tx: broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            gateway,
            fallback_message: fallback_message.into(),
            events,
            runtime_tx,
            next_request: 0,
            in_flight: HashSet::new(),
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    fn display(&self, author: MessageAuthor, text: &str) {
        let _ = self
            .runtime_tx
            .send(RuntimeEvent::Message(ChatMessage::new(author, text)));
    }

    /// Display `text` as the user's message and send it to the backend.
    ///
    /// The reply comes back through the event channel as a
    /// [`BackendReply`]. Returns `None` for blank input.
    pub fn submit(&mut self, controller: &mut CharacterController, text: &str) -> Option<RequestId> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty user message");
            return None;
        }

        self.display(MessageAuthor::User, text);
        controller.set_state(CharacterState::Thinking);

        self.next_request += 1;
        let request = RequestId(self.next_request);
        self.in_flight.insert(request);
        info!(request = %request, chars = text.chars().count(), "sending message to backend");

        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let message = text.to_owned();
        tokio::spawn(async move {
            let result = gateway.send(&message).await;
            events.backend_reply(BackendReply { request, result });
        });
        Some(request)
    }

    /// Show and speak a backend reply, or the fallback apology on failure.
    pub fn on_reply(&mut self, controller: &mut CharacterController, reply: BackendReply) {
        self.in_flight.remove(&reply.request);
        let text = match reply.result {
            Ok(text) => text,
            Err(e) => {
                error!(request = %reply.request, "backend request failed: {e}");
                self.display(MessageAuthor::Bot, &self.fallback_message);
                controller.set_state(CharacterState::Idle);
                return;
            }
        };

        self.display(MessageAuthor::Bot, &text);

        if controller.is_speaking() {
            info!(request = %reply.request, "reply arrived while speaking, not voicing it");
            controller.set_state(CharacterState::Idle);
            return;
        }
        if controller.speak(&text).is_none() {
            controller.set_state(CharacterState::Idle);
        }
    }

    /// Show and speak the start-overlay greeting.
    pub fn greet(&mut self, controller: &mut CharacterController, greeting: &str) {
        if greeting.trim().is_empty() {
            return;
        }
        self.display(MessageAuthor::Bot, greeting);
        controller.speak(greeting);
    }
}
