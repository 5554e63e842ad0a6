//! Headless collaborators for running the widget core without a browser.
//!
//! The render service and media only log; speech output "speaks" by pacing
//! word boundaries on a timer; speech input is fed by the host through
//! [`HeardInjector`].

use crate::character::CharacterState;
use crate::character::media::{FaceMedia, MediaId, MediaResource, ReadyState};
use crate::character::render::{ClipRequest, RenderService, TextureHandle};
use crate::config::WidgetConfig;
use crate::error::Result;
use crate::gateway::BackendGateway;
use crate::pipeline::controller::ControllerParts;
use crate::pipeline::coordinator::WidgetCoordinator;
use crate::pipeline::messages::{EventSender, event_channel};
use crate::speech::input::{
    RecognitionEvent, RecognitionEventKind, RecognitionSessionId, SpeechInput, StartError,
};
use crate::speech::output::{SpeechOutput, SpeechOutputEvent, SpeechOutputEventKind, Utterance};
use crate::speech::voice::VoiceInfo;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time the console voice spends on each word.
pub const CONSOLE_WORD_PACE: Duration = Duration::from_millis(250);

/// Render service that hands out texture ids and logs requests.
#[derive(Debug, Default)]
pub struct LoggingRender {
    next_texture: u64,
}

impl RenderService for LoggingRender {
    fn create_video_texture(&mut self, media: &MediaId) -> Result<TextureHandle> {
        self.next_texture += 1;
        debug!(media = %media, texture = self.next_texture, "video texture created");
        Ok(TextureHandle(self.next_texture))
    }

    fn set_face_texture(&mut self, texture: TextureHandle) {
        debug!(texture = texture.0, "face texture bound");
    }

    fn play_clip(&mut self, request: &ClipRequest) {
        debug!(clip = %request.clip, blend_ms = request.blend().as_millis() as u64, "clip requested");
    }
}

/// A media source with nothing to decode.
#[derive(Debug)]
pub struct StaticMedia {
    id: MediaId,
}

impl StaticMedia {
    pub fn new(state: CharacterState) -> Self {
        Self {
            id: MediaId::for_state(state),
        }
    }
}

impl MediaResource for StaticMedia {
    fn id(&self) -> &MediaId {
        &self.id
    }

    fn pause(&mut self) {}

    fn rewind(&mut self) {}

    fn play(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Face media over [`StaticMedia`].
pub fn static_face_media() -> FaceMedia {
    FaceMedia::new(
        Box::new(StaticMedia::new(CharacterState::Idle)),
        Box::new(StaticMedia::new(CharacterState::Thinking)),
        Box::new(StaticMedia::new(CharacterState::Talking)),
    )
}

/// Report every eye video as fully buffered.
pub fn report_media_ready(events: &EventSender) {
    for state in CharacterState::ALL {
        events.media(state, ReadyState::HaveEnoughData);
    }
}

/// Speech output that logs the text and reports progress one word per `pace`.
pub struct ConsoleSpeechOutput {
    events: EventSender,
    voices: Vec<VoiceInfo>,
    pace: Duration,
    current: Option<CancellationToken>,
}

impl ConsoleSpeechOutput {
    pub fn new(events: EventSender, voices: Vec<VoiceInfo>, pace: Duration) -> Self {
        Self {
            events,
            voices,
            pace,
            current: None,
        }
    }
}

impl SpeechOutput for ConsoleSpeechOutput {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.cancel();
        info!(
            utterance = %utterance.id,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            "bot says: {}",
            utterance.text
        );

        let token = CancellationToken::new();
        self.current = Some(token.clone());
        let events = self.events.clone();
        let pace = self.pace;
        tokio::spawn(async move {
            let id = utterance.id;
            events.speech_output(SpeechOutputEvent::new(id, SpeechOutputEventKind::Started));
            let boundaries = word_boundaries(&utterance.text);
            for char_index in boundaries {
                tokio::select! {
                    () = token.cancelled() => {
                        events.speech_output(SpeechOutputEvent::new(
                            id,
                            SpeechOutputEventKind::Failed { error: "interrupted".into() },
                        ));
                        return;
                    }
                    () = tokio::time::sleep(pace) => {
                        events.speech_output(SpeechOutputEvent::new(
                            id,
                            SpeechOutputEventKind::Boundary { char_index },
                        ));
                    }
                }
            }
            events.speech_output(SpeechOutputEvent::new(id, SpeechOutputEventKind::Ended));
        });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

/// Character index of the start of every word.
fn word_boundaries(text: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut in_word = false;
    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            out.push(i);
        }
    }
    out
}

#[derive(Debug, Default)]
struct HeardState {
    session: Option<RecognitionSessionId>,
}

/// Speech input whose transcripts come from the host (`speech.heard`).
pub struct HostSpeechInput {
    events: EventSender,
    state: Arc<Mutex<HeardState>>,
}

/// Delivers host-provided transcripts to the active session.
#[derive(Clone)]
pub struct HeardInjector {
    events: EventSender,
    state: Arc<Mutex<HeardState>>,
}

impl HostSpeechInput {
    pub fn new(events: EventSender) -> (Self, HeardInjector) {
        let state = Arc::new(Mutex::new(HeardState::default()));
        (
            Self {
                events: events.clone(),
                state: Arc::clone(&state),
            },
            HeardInjector { events, state },
        )
    }

    fn take_session(&self) -> Option<RecognitionSessionId> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .session
            .take()
    }
}

impl SpeechInput for HostSpeechInput {
    fn start(&mut self, session: RecognitionSessionId) -> std::result::Result<(), StartError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.session.is_some() {
            return Err(StartError::AlreadyStarted);
        }
        state.session = Some(session);
        debug!(session = %session, "listening for host transcripts");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(session) = self.take_session() {
            self.events
                .recognition(RecognitionEvent::new(session, RecognitionEventKind::End));
        }
    }

    fn abort(&mut self) {
        self.take_session();
    }
}

impl HeardInjector {
    /// Deliver `transcript` as the result of the active session, which then
    /// ends. Returns `false` when no session is listening.
    pub fn hear(&self, transcript: &str) -> bool {
        let session = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .session
            .take();
        let Some(session) = session else {
            return false;
        };
        self.events.recognition(RecognitionEvent::new(
            session,
            RecognitionEventKind::Result {
                transcript: transcript.to_owned(),
            },
        ));
        self.events
            .recognition(RecognitionEvent::new(session, RecognitionEventKind::End));
        true
    }

    pub fn is_listening(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .session
            .is_some()
    }
}

/// Assemble a widget from the console collaborators.
///
/// Media readiness is reported right away, so the texture cache is built on
/// the loop's first turns. The injector is `None` when `with_recognition` is
/// false.
pub fn console_widget(
    config: &WidgetConfig,
    gateway: Arc<dyn BackendGateway>,
    with_recognition: bool,
) -> (WidgetCoordinator, Option<HeardInjector>) {
    let (events, events_rx) = event_channel();
    let voices = vec![VoiceInfo::new("Console", config.speech.lang.clone())
        .with_gender(config.speech.persona_gender)];
    let output = ConsoleSpeechOutput::new(events.clone(), voices, CONSOLE_WORD_PACE);

    let (input, injector) = if with_recognition {
        let (input, injector) = HostSpeechInput::new(events.clone());
        (Some(Box::new(input) as Box<dyn SpeechInput>), Some(injector))
    } else {
        (None, None)
    };

    report_media_ready(&events);
    let parts = ControllerParts {
        render: Box::new(LoggingRender::default()),
        media: static_face_media(),
        speech_output: Box::new(output),
        speech_input: input,
    };
    (
        WidgetCoordinator::new(config, parts, gateway, events, events_rx),
        injector,
    )
}
