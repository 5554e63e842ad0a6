//! Shared test doubles for the render, media and speech seams.
//!
//! Each fake hands back a probe sharing its state, so a test can keep
//! inspecting a collaborator after boxing it into the controller.

use crate::character::CharacterState;
use crate::character::media::{FaceMedia, MediaId, MediaResource};
use crate::character::render::{ClipRequest, RenderService, TextureHandle};
use crate::error::{Result, WidgetError};
use crate::speech::input::{RecognitionSessionId, SpeechInput, StartError};
use crate::speech::output::{SpeechOutput, Utterance};
use crate::speech::voice::VoiceInfo;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MediaState {
    playing: bool,
    rewinds: usize,
}

pub struct FakeMedia {
    id: MediaId,
    state: Arc<Mutex<MediaState>>,
}

#[derive(Clone)]
pub struct MediaProbe {
    state: Arc<Mutex<MediaState>>,
}

impl FakeMedia {
    pub fn new(for_state: CharacterState) -> (Self, MediaProbe) {
        let state = Arc::new(Mutex::new(MediaState::default()));
        (
            Self {
                id: MediaId::for_state(for_state),
                state: Arc::clone(&state),
            },
            MediaProbe { state },
        )
    }
}

impl MediaResource for FakeMedia {
    fn id(&self) -> &MediaId {
        &self.id
    }

    fn pause(&mut self) {
        lock(&self.state).playing = false;
    }

    fn rewind(&mut self) {
        lock(&self.state).rewinds += 1;
    }

    fn play(&mut self) -> Result<()> {
        lock(&self.state).playing = true;
        Ok(())
    }
}

impl MediaProbe {
    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn rewinds(&self) -> usize {
        lock(&self.state).rewinds
    }
}

/// Face media over three fakes, probes in `CharacterState::ALL` order.
pub fn fake_face_media() -> (FaceMedia, [MediaProbe; 3]) {
    let (idle, idle_probe) = FakeMedia::new(CharacterState::Idle);
    let (thinking, thinking_probe) = FakeMedia::new(CharacterState::Thinking);
    let (talking, talking_probe) = FakeMedia::new(CharacterState::Talking);
    (
        FaceMedia::new(Box::new(idle), Box::new(thinking), Box::new(talking)),
        [idle_probe, thinking_probe, talking_probe],
    )
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RenderState {
    next_texture: u64,
    textures_created: usize,
    fail: bool,
    face_texture: Option<TextureHandle>,
    clips: Vec<ClipRequest>,
}

pub struct FakeRender {
    state: Arc<Mutex<RenderState>>,
}

#[derive(Clone)]
pub struct RenderProbe {
    state: Arc<Mutex<RenderState>>,
}

impl FakeRender {
    pub fn new() -> (Self, RenderProbe) {
        let state = Arc::new(Mutex::new(RenderState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            RenderProbe { state },
        )
    }
}

impl RenderService for FakeRender {
    fn create_video_texture(&mut self, media: &MediaId) -> Result<TextureHandle> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(WidgetError::Render(format!("no texture for {media}")));
        }
        state.next_texture += 1;
        state.textures_created += 1;
        Ok(TextureHandle(state.next_texture))
    }

    fn set_face_texture(&mut self, texture: TextureHandle) {
        lock(&self.state).face_texture = Some(texture);
    }

    fn play_clip(&mut self, request: &ClipRequest) {
        lock(&self.state).clips.push(request.clone());
    }
}

impl RenderProbe {
    pub fn textures_created(&self) -> usize {
        lock(&self.state).textures_created
    }

    pub fn fail_texture_creation(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    pub fn face_texture(&self) -> Option<TextureHandle> {
        lock(&self.state).face_texture
    }

    pub fn clips(&self) -> Vec<ClipRequest> {
        lock(&self.state).clips.clone()
    }

    pub fn last_clip(&self) -> Option<ClipRequest> {
        lock(&self.state).clips.last().cloned()
    }
}

// ---------------------------------------------------------------------------
// Speech output
// ---------------------------------------------------------------------------

#[derive(Default)]
struct OutputState {
    voices: Vec<VoiceInfo>,
    spoken: Vec<Utterance>,
    cancels: usize,
    reject: bool,
}

pub struct FakeSpeechOutput {
    state: Arc<Mutex<OutputState>>,
}

#[derive(Clone)]
pub struct OutputProbe {
    state: Arc<Mutex<OutputState>>,
}

impl FakeSpeechOutput {
    pub fn new(voices: Vec<VoiceInfo>) -> (Self, OutputProbe) {
        let state = Arc::new(Mutex::new(OutputState {
            voices,
            ..OutputState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            OutputProbe { state },
        )
    }
}

impl SpeechOutput for FakeSpeechOutput {
    fn voices(&self) -> Vec<VoiceInfo> {
        lock(&self.state).voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let mut state = lock(&self.state);
        if state.reject {
            return Err(WidgetError::Speech("engine rejected utterance".into()));
        }
        state.spoken.push(utterance);
        Ok(())
    }

    fn cancel(&mut self) {
        lock(&self.state).cancels += 1;
    }
}

impl OutputProbe {
    pub fn spoken(&self) -> Vec<Utterance> {
        lock(&self.state).spoken.clone()
    }

    pub fn last(&self) -> Option<Utterance> {
        lock(&self.state).spoken.last().cloned()
    }

    pub fn cancels(&self) -> usize {
        lock(&self.state).cancels
    }

    pub fn reject_next(&self, reject: bool) {
        lock(&self.state).reject = reject;
    }
}

// ---------------------------------------------------------------------------
// Speech input
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InputState {
    started: Vec<RecognitionSessionId>,
    stops: usize,
    aborts: usize,
    fail_with: Option<StartError>,
}

pub struct FakeSpeechInput {
    state: Arc<Mutex<InputState>>,
}

#[derive(Clone)]
pub struct InputProbe {
    state: Arc<Mutex<InputState>>,
}

impl FakeSpeechInput {
    pub fn new() -> (Self, InputProbe) {
        let state = Arc::new(Mutex::new(InputState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            InputProbe { state },
        )
    }
}

impl SpeechInput for FakeSpeechInput {
    fn start(&mut self, session: RecognitionSessionId) -> std::result::Result<(), StartError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.fail_with.clone() {
            return Err(err);
        }
        state.started.push(session);
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).stops += 1;
    }

    fn abort(&mut self) {
        lock(&self.state).aborts += 1;
    }
}

impl InputProbe {
    pub fn starts(&self) -> usize {
        lock(&self.state).started.len()
    }

    pub fn last_session(&self) -> Option<RecognitionSessionId> {
        lock(&self.state).started.last().copied()
    }

    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }

    pub fn aborts(&self) -> usize {
        lock(&self.state).aborts
    }

    pub fn fail_start_with(&self, err: Option<StartError>) {
        lock(&self.state).fail_with = err;
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Gateway answering from a queue of canned results; empty queue echoes.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<std::collections::VecDeque<Result<String>>>,
    received: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<String>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn received(&self) -> Vec<String> {
        lock(&self.received).clone()
    }
}

#[async_trait::async_trait]
impl crate::gateway::BackendGateway for ScriptedGateway {
    async fn send(&self, message: &str) -> Result<String> {
        lock(&self.received).push(message.to_owned());
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {message}")))
    }
}
