//! Cancelable delayed continuations for the controller.
//!
//! Each continuation lives in a named slot; scheduling into an occupied slot
//! replaces the pending one. Actions carry the generation they were
//! scheduled for (utterance id or recognition epoch) and the controller
//! re-checks it, plus its own preconditions, when the action fires.

use crate::speech::output::UtteranceId;
use futures_util::future::poll_fn;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::time::{DelayQueue, delay_queue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    SpeechWatchdog,
    SpeechStall,
    SpeechCooldown,
    RecognitionRestart,
    MicrophoneArm,
}

/// Why a recognition restart was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    AfterSpeech,
    SessionEnded,
    NetworkBackoff,
    ForceReset,
}

impl RestartReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RestartReason::AfterSpeech => "after_speech",
            RestartReason::SessionEnded => "session_ended",
            RestartReason::NetworkBackoff => "network_backoff",
            RestartReason::ForceReset => "force_reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Hard upper bound on one utterance.
    SpeechWatchdog { utterance: UtteranceId },
    /// No progress reported for the stall window.
    SpeechStall { utterance: UtteranceId },
    /// Trailing quiet period after speech; clears the speaking flag.
    SpeechCooldown { utterance: UtteranceId },
    RestartRecognition { epoch: u64, reason: RestartReason },
    /// Turn the microphone on after the greeting started.
    ArmMicrophone,
}

impl TimerAction {
    pub fn slot(&self) -> TimerSlot {
        match self {
            TimerAction::SpeechWatchdog { .. } => TimerSlot::SpeechWatchdog,
            TimerAction::SpeechStall { .. } => TimerSlot::SpeechStall,
            TimerAction::SpeechCooldown { .. } => TimerSlot::SpeechCooldown,
            TimerAction::RestartRecognition { .. } => TimerSlot::RecognitionRestart,
            TimerAction::ArmMicrophone => TimerSlot::MicrophoneArm,
        }
    }
}

/// Slot-keyed timer queue.
#[derive(Debug, Default)]
pub struct Timers {
    queue: DelayQueue<TimerAction>,
    keys: HashMap<TimerSlot, delay_queue::Key>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` after `delay`, replacing whatever its slot held.
    pub fn schedule(&mut self, action: TimerAction, delay: Duration) {
        let slot = action.slot();
        self.cancel(slot);
        let key = self.queue.insert(action, delay);
        self.keys.insert(slot, key);
    }

    /// Cancel the pending action in `slot`. Returns whether one was pending.
    pub fn cancel(&mut self, slot: TimerSlot) -> bool {
        match self.keys.remove(&slot) {
            Some(key) => self.queue.try_remove(&key).is_some(),
            None => false,
        }
    }

    /// Cancel the watchdog, stall detector and cooldown.
    pub fn cancel_speech(&mut self) {
        self.cancel(TimerSlot::SpeechWatchdog);
        self.cancel(TimerSlot::SpeechStall);
        self.cancel(TimerSlot::SpeechCooldown);
    }

    pub fn is_pending(&self, slot: TimerSlot) -> bool {
        self.keys.contains_key(&slot)
    }

    pub fn pending(&self) -> usize {
        self.keys.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.keys.clear();
    }

    /// Wait for the next action to fire.
    ///
    /// Never resolves while nothing is scheduled. Cancel safe: dropping the
    /// future loses no action.
    pub async fn expired(&mut self) -> TimerAction {
        loop {
            if self.queue.is_empty() {
                std::future::pending::<()>().await;
            }
            if let Some(expired) = poll_fn(|cx| self.queue.poll_expired(cx)).await {
                let action = expired.into_inner();
                self.keys.remove(&action.slot());
                return action;
            }
        }
    }
}
