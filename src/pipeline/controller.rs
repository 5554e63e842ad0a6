//! Character state controller.
//!
//! Sole owner of the avatar's visible state, the bot-speaking flag, the
//! recognition session and the microphone intent. Nothing else calls the
//! render service or the speech primitives.
//!
//! All methods are synchronous and run to completion on the coordinator
//! task. Delayed work goes through [`Timers`]; asynchronous collaborator
//! callbacks arrive as [`SpeechOutputEvent`] / [`RecognitionEvent`] stamped
//! with the utterance or session they belong to, so late events from a
//! cancelled utterance or an aborted session are recognised and dropped.

use crate::character::CharacterState;
use crate::character::media::{FaceMedia, ReadyState};
use crate::character::render::{ClipRequest, ClipTransition, RenderService};
use crate::config::{AnimationConfig, SpeechOutputConfig, TimingConfig, WidgetConfig};
use crate::pipeline::messages::WidgetStatus;
use crate::pipeline::timers::{RestartReason, TimerAction, TimerSlot, Timers};
use crate::runtime::RuntimeEvent;
use crate::speech::input::{
    RecognitionErrorKind, RecognitionEvent, RecognitionEventKind, RecognitionSessionId,
    RecognitionSessionState, SpeechInput, StartError,
};
use crate::speech::output::{
    SpeechOutput, SpeechOutputEvent, SpeechOutputEventKind, Utterance, UtteranceId,
};
use crate::speech::voice::select_voice;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub const NOTICE_RECOGNITION_UNSUPPORTED: &str =
    "Speech recognition is not supported in this environment.";
pub const NOTICE_MICROPHONE_DENIED: &str =
    "Microphone access was denied. Allow it in the browser settings to talk to the assistant.";
pub const NOTICE_MICROPHONE_UNAVAILABLE: &str =
    "No working microphone was found. Voice input is turned off.";

/// Why an utterance was concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeechOutcome {
    Completed,
    Failed,
    Rejected,
    WatchdogExpired,
    Stalled,
}

impl SpeechOutcome {
    fn as_str(self) -> &'static str {
        match self {
            SpeechOutcome::Completed => "completed",
            SpeechOutcome::Failed => "failed",
            SpeechOutcome::Rejected => "rejected",
            SpeechOutcome::WatchdogExpired => "watchdog",
            SpeechOutcome::Stalled => "stalled",
        }
    }
}

/// Collaborators handed to the controller at construction.
pub struct ControllerParts {
    pub render: Box<dyn RenderService>,
    pub media: FaceMedia,
    pub speech_output: Box<dyn SpeechOutput>,
    /// `None` when the platform has no speech recognition.
    pub speech_input: Option<Box<dyn SpeechInput>>,
}

pub struct CharacterController {
    speech_config: SpeechOutputConfig,
    timing: TimingConfig,
    animation: AnimationConfig,

    render: Box<dyn RenderService>,
    media: FaceMedia,
    output: Box<dyn SpeechOutput>,
    input: Option<Box<dyn SpeechInput>>,

    state: CharacterState,
    current_clip: Option<String>,

    /// Utterance whose end/error/progress events are still awaited.
    live_utterance: Option<UtteranceId>,
    /// Utterance holding the speaking flag (through the cooldown).
    speaking_utterance: Option<UtteranceId>,
    next_utterance: u64,

    recognition: RecognitionSessionState,
    session: Option<RecognitionSessionId>,
    next_session: u64,
    /// Bumped whenever pending restarts must be invalidated.
    recognition_epoch: u64,
    microphone_intent: bool,

    timers: Timers,
    runtime_tx: broadcast::Sender<RuntimeEvent>,
}

impl CharacterController {
    pub fn new(
        config: &WidgetConfig,
        parts: ControllerParts,
        runtime_tx: broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            speech_config: config.speech.clone(),
            timing: config.timing.clone(),
            animation: config.animation.clone(),
            render: parts.render,
            media: parts.media,
            output: parts.speech_output,
            input: parts.speech_input,
            state: CharacterState::Idle,
            current_clip: None,
            live_utterance: None,
            speaking_utterance: None,
            next_utterance: 0,
            recognition: RecognitionSessionState::Stopped,
            session: None,
            next_session: 0,
            recognition_epoch: 0,
            microphone_intent: false,
            timers: Timers::new(),
            runtime_tx,
        }
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking_utterance.is_some()
    }

    pub fn recognition_state(&self) -> RecognitionSessionState {
        self.recognition
    }

    pub fn microphone_intent(&self) -> bool {
        self.microphone_intent
    }

    pub fn recognition_available(&self) -> bool {
        self.input.is_some()
    }

    pub fn status(&self, pending_requests: usize) -> WidgetStatus {
        WidgetStatus {
            state: self.state,
            speaking: self.is_speaking(),
            recognition: self.recognition,
            microphone_intent: self.microphone_intent,
            recognition_available: self.recognition_available(),
            textures_ready: self.media.textures().is_some(),
            pending_requests,
        }
    }

    fn emit(&self, event: RuntimeEvent) {
        // No subscribers is fine.
        let _ = self.runtime_tx.send(event);
    }

    fn notice(&self, text: &str) {
        self.emit(RuntimeEvent::Notice {
            text: text.to_owned(),
        });
    }

    // -----------------------------------------------------------------------
    // Visible state
    // -----------------------------------------------------------------------

    /// Make `target` the visible state. Never rejected; re-applies the
    /// bindings when `target` is already current.
    pub fn set_state(&mut self, target: CharacterState) {
        match self.media.show(target) {
            Some(texture) => self.render.set_face_texture(texture),
            None => debug!(state = %target, "face textures not built yet"),
        }

        let binding = self.animation.binding(target);
        let duration = binding.cross_fade();
        let transition = match self.current_clip.take() {
            Some(from) => ClipTransition::CrossFade { from, duration },
            None => ClipTransition::FadeIn { duration },
        };
        let request = ClipRequest {
            clip: binding.clip.clone(),
            transition,
        };
        self.render.play_clip(&request);
        self.current_clip = Some(request.clip);

        let previous = std::mem::replace(&mut self.state, target);
        info!(from = %previous, to = %target, "character state");
        self.emit(RuntimeEvent::StateChanged { state: target });
    }

    /// Record a media readiness report; builds the texture cache once all
    /// three videos can play.
    pub fn on_media_ready(&mut self, state: CharacterState, level: ReadyState) {
        if !self.media.record_readiness(state, level) {
            return;
        }
        match self.media.build_textures(self.render.as_mut()) {
            Ok(cache) => self.render.set_face_texture(cache.get(self.state)),
            Err(e) => warn!("failed to build face textures: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Speech output
    // -----------------------------------------------------------------------

    fn set_speaking(&mut self, utterance: Option<UtteranceId>) {
        let was = self.is_speaking();
        self.speaking_utterance = utterance;
        let now = self.is_speaking();
        if was != now {
            self.emit(RuntimeEvent::SpeakingChanged { speaking: now });
        }
    }

    /// Speak `text` with the avatar in `Talking`.
    ///
    /// Returns the utterance id, or `None` when `text` is blank.
    pub fn speak(&mut self, text: &str) -> Option<UtteranceId> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty utterance");
            return None;
        }

        self.stop_recognition();
        self.output.cancel();
        self.timers.cancel_speech();
        self.set_state(CharacterState::Talking);

        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        self.live_utterance = Some(id);
        self.set_speaking(Some(id));

        let voices = self.output.voices();
        let voice = select_voice(&voices, &self.speech_config.voice_preferences()).cloned();
        if voice.is_none() {
            debug!(utterance = %id, "no voice available, using engine default");
        }
        let utterance = Utterance {
            id,
            text: text.to_owned(),
            lang: self.speech_config.lang.clone(),
            rate: self.speech_config.rate,
            pitch: self.speech_config.pitch,
            voice,
        };

        self.timers.schedule(
            TimerAction::SpeechWatchdog { utterance: id },
            self.timing.watchdog_for(text),
        );
        self.timers.schedule(
            TimerAction::SpeechStall { utterance: id },
            self.timing.stall_window(),
        );

        info!(utterance = %id, chars = text.chars().count(), "speaking");
        if let Err(e) = self.output.speak(utterance) {
            warn!(utterance = %id, "speech output rejected utterance: {e}");
            self.reset_after_speech(id, SpeechOutcome::Rejected);
        }
        Some(id)
    }

    pub fn on_speech_event(&mut self, event: SpeechOutputEvent) {
        if self.live_utterance != Some(event.utterance) {
            debug!(utterance = %event.utterance, kind = ?event.kind, "stale speech event");
            return;
        }
        match event.kind {
            SpeechOutputEventKind::Started | SpeechOutputEventKind::Boundary { .. } => {
                self.timers.schedule(
                    TimerAction::SpeechStall {
                        utterance: event.utterance,
                    },
                    self.timing.stall_window(),
                );
            }
            SpeechOutputEventKind::Ended => {
                self.reset_after_speech(event.utterance, SpeechOutcome::Completed);
            }
            SpeechOutputEventKind::Failed { error } => {
                warn!(utterance = %event.utterance, "speech output failed: {error}");
                self.reset_after_speech(event.utterance, SpeechOutcome::Failed);
            }
        }
    }

    /// Conclude `utterance`. Runs at most once per utterance.
    fn reset_after_speech(&mut self, utterance: UtteranceId, outcome: SpeechOutcome) {
        if self.live_utterance != Some(utterance) {
            return;
        }
        self.live_utterance = None;
        self.timers.cancel(TimerSlot::SpeechWatchdog);
        self.timers.cancel(TimerSlot::SpeechStall);

        info!(utterance = %utterance, outcome = outcome.as_str(), "speech concluded");
        self.set_state(CharacterState::Idle);
        self.timers.schedule(
            TimerAction::SpeechCooldown { utterance },
            self.timing.speech_cooldown(),
        );
    }

    fn on_cooldown_elapsed(&mut self, utterance: UtteranceId) {
        if self.speaking_utterance != Some(utterance) {
            return;
        }
        self.set_speaking(None);

        // A session may have been started by the platform behind our back
        // while we were speaking; it would transcribe the tail of our voice.
        if self.recognition != RecognitionSessionState::Stopped {
            self.abort_recognition();
        }

        if self.microphone_intent {
            self.schedule_restart(RestartReason::AfterSpeech, self.timing.post_speech_restart());
        }
    }

    /// Watchdog or stall detector fired for a still-live utterance.
    fn force_speech_end(&mut self, utterance: UtteranceId, outcome: SpeechOutcome) {
        if self.live_utterance != Some(utterance) {
            return;
        }
        warn!(utterance = %utterance, outcome = outcome.as_str(), "speech did not finish, forcing cleanup");
        self.output.cancel();
        self.reset_after_speech(utterance, outcome);
    }

    // -----------------------------------------------------------------------
    // Speech input
    // -----------------------------------------------------------------------

    /// Start a recognition session if the input channel exists, no session
    /// is running and the bot is not speaking. Returns whether one started.
    pub fn start_recognition(&mut self) -> bool {
        if self.recognition != RecognitionSessionState::Stopped {
            debug!(state = ?self.recognition, "recognition already running");
            return false;
        }
        if self.is_speaking() {
            debug!("not starting recognition while speaking");
            return false;
        }
        let Some(input) = self.input.as_mut() else {
            return false;
        };

        self.next_session += 1;
        let session = RecognitionSessionId(self.next_session);
        self.recognition = RecognitionSessionState::Starting;
        match input.start(session) {
            Ok(()) => {
                self.session = Some(session);
                self.recognition = RecognitionSessionState::Active;
                info!(session = %session, "recognition started");
                true
            }
            Err(e) => {
                warn!(session = %session, kind = e.kind(), "recognition start failed: {e}");
                self.session = None;
                self.recognition = RecognitionSessionState::Stopped;
                match e {
                    StartError::NotAllowed => self.disable_microphone(NOTICE_MICROPHONE_DENIED),
                    StartError::AudioCapture => {
                        self.disable_microphone(NOTICE_MICROPHONE_UNAVAILABLE);
                    }
                    StartError::AlreadyStarted | StartError::Other(_) => {}
                }
                false
            }
        }
    }

    /// Gracefully stop the active session. `Stopped` is reached on `End`.
    pub fn stop_recognition(&mut self) {
        if self.recognition != RecognitionSessionState::Active {
            return;
        }
        if let Some(input) = self.input.as_mut() {
            input.stop();
            self.recognition = RecognitionSessionState::Stopping;
            debug!(session = ?self.session, "recognition stopping");
        }
    }

    /// Abort unconditionally; events from the aborted session become stale.
    fn abort_recognition(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.abort();
        }
        if let Some(session) = self.session.take() {
            debug!(session = %session, "recognition aborted");
        }
        self.recognition = RecognitionSessionState::Stopped;
    }

    fn schedule_restart(&mut self, reason: RestartReason, delay: std::time::Duration) {
        debug!(reason = reason.as_str(), delay_ms = delay.as_millis() as u64, "recognition restart scheduled");
        self.timers.schedule(
            TimerAction::RestartRecognition {
                epoch: self.recognition_epoch,
                reason,
            },
            delay,
        );
    }

    fn invalidate_restarts(&mut self) {
        self.recognition_epoch += 1;
        self.timers.cancel(TimerSlot::RecognitionRestart);
    }

    /// Handle a recognition event. Returns the transcript to dispatch, if any.
    pub fn on_recognition_event(&mut self, event: RecognitionEvent) -> Option<String> {
        if self.session != Some(event.session) {
            debug!(session = %event.session, kind = ?event.kind, "stale recognition event");
            return None;
        }
        match event.kind {
            RecognitionEventKind::Result { transcript } => self.on_result(&transcript),
            RecognitionEventKind::Error(kind) => {
                self.on_error(kind);
                None
            }
            RecognitionEventKind::End => {
                self.on_end();
                None
            }
        }
    }

    fn on_result(&mut self, transcript: &str) -> Option<String> {
        if self.is_speaking() {
            info!("ignoring recognized speech while the bot is speaking");
            return None;
        }
        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("ignoring empty transcript");
            return None;
        }
        info!(chars = transcript.chars().count(), "speech recognized");
        Some(transcript.to_owned())
    }

    fn on_error(&mut self, kind: RecognitionErrorKind) {
        // The session id is kept: the End that follows still belongs to it.
        self.recognition = RecognitionSessionState::Stopped;
        match kind {
            RecognitionErrorKind::Network => {
                warn!("recognition network error, backing off");
                if self.microphone_intent && !self.is_speaking() {
                    self.schedule_restart(RestartReason::NetworkBackoff, self.timing.network_backoff());
                }
            }
            RecognitionErrorKind::NoSpeech => debug!("no speech detected"),
            kind if kind.is_fatal() => {
                warn!(error = %kind, "recognition unavailable, turning microphone off");
                let text = match kind {
                    RecognitionErrorKind::AudioCapture => NOTICE_MICROPHONE_UNAVAILABLE,
                    _ => NOTICE_MICROPHONE_DENIED,
                };
                self.disable_microphone(text);
            }
            other => warn!(error = %other, "recognition error"),
        }
    }

    /// Permission or capture failure: listening cannot resume until the user
    /// turns the microphone on again.
    fn disable_microphone(&mut self, notice: &str) {
        self.invalidate_restarts();
        self.timers.cancel(TimerSlot::MicrophoneArm);
        if self.microphone_intent {
            self.microphone_intent = false;
            self.emit(RuntimeEvent::MicrophoneChanged { active: false });
        }
        self.notice(notice);
    }

    fn on_end(&mut self) {
        self.recognition = RecognitionSessionState::Stopped;
        self.session = None;
        debug!("recognition session ended");
        // A pending network backoff takes precedence over the quick restart.
        if self.microphone_intent
            && !self.is_speaking()
            && !self.timers.is_pending(TimerSlot::RecognitionRestart)
        {
            self.schedule_restart(RestartReason::SessionEnded, self.timing.recognition_restart());
        }
    }

    fn on_restart_due(&mut self, epoch: u64, reason: RestartReason) {
        if epoch != self.recognition_epoch {
            debug!(reason = reason.as_str(), "stale recognition restart");
            return;
        }
        if !self.microphone_intent || self.is_speaking() {
            debug!(reason = reason.as_str(), "recognition restart no longer wanted");
            return;
        }
        self.start_recognition();
    }

    // -----------------------------------------------------------------------
    // Microphone intent
    // -----------------------------------------------------------------------

    /// Turn continuous listening on or off. Returns the resulting intent.
    pub fn set_microphone_intent(&mut self, enabled: bool) -> bool {
        if enabled {
            if self.input.is_none() {
                self.notice(NOTICE_RECOGNITION_UNSUPPORTED);
                self.emit(RuntimeEvent::MicrophoneChanged { active: false });
                return false;
            }
            self.microphone_intent = true;
            info!("microphone on");
            self.emit(RuntimeEvent::MicrophoneChanged { active: true });
            self.start_recognition();
        } else {
            self.microphone_intent = false;
            self.invalidate_restarts();
            self.timers.cancel(TimerSlot::MicrophoneArm);
            self.stop_recognition();
            info!("microphone off");
            self.emit(RuntimeEvent::MicrophoneChanged { active: false });
        }
        self.microphone_intent
    }

    pub fn toggle_microphone(&mut self) -> bool {
        self.set_microphone_intent(!self.microphone_intent)
    }

    /// Turn the microphone on after `delay` (start overlay opt-in).
    pub fn arm_microphone_later(&mut self) {
        self.timers
            .schedule(TimerAction::ArmMicrophone, self.timing.greeting_mic_delay());
    }

    // -----------------------------------------------------------------------
    // Recovery and timers
    // -----------------------------------------------------------------------

    /// Manual full recovery to a known-good state.
    pub fn force_reset_all(&mut self) {
        warn!(state = %self.state, speaking = self.is_speaking(), recognition = ?self.recognition, "forcing full reset");
        self.output.cancel();
        self.timers.cancel_speech();
        self.live_utterance = None;
        self.set_state(CharacterState::Idle);
        self.set_speaking(None);

        self.abort_recognition();
        self.invalidate_restarts();
        if self.microphone_intent {
            self.schedule_restart(RestartReason::ForceReset, self.timing.force_reset_restart());
        }
    }

    /// Wait for the next scheduled action.
    pub async fn next_timer(&mut self) -> TimerAction {
        self.timers.expired().await
    }

    pub fn on_timer(&mut self, action: TimerAction) {
        match action {
            TimerAction::SpeechWatchdog { utterance } => {
                self.force_speech_end(utterance, SpeechOutcome::WatchdogExpired);
            }
            TimerAction::SpeechStall { utterance } => {
                self.force_speech_end(utterance, SpeechOutcome::Stalled);
            }
            TimerAction::SpeechCooldown { utterance } => self.on_cooldown_elapsed(utterance),
            TimerAction::RestartRecognition { epoch, reason } => self.on_restart_due(epoch, reason),
            TimerAction::ArmMicrophone => {
                if !self.microphone_intent {
                    self.set_microphone_intent(true);
                }
            }
        }
    }

    /// Release the speech channels and drop pending work.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.output.cancel();
        self.live_utterance = None;
        self.set_speaking(None);
        if self.recognition != RecognitionSessionState::Stopped {
            self.abort_recognition();
        }
        info!("character controller shut down");
    }
}
