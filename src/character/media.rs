//! Eye-video media resources and the face texture cache.
//!
//! Each character state has its own looping video. Textures sampling those
//! videos are built once, after all three videos can play, and reused on
//! every transition afterwards. Rebuilding them per transition leaks GPU
//! memory and stutters the render loop.

use crate::character::CharacterState;
use crate::character::render::{RenderService, TextureHandle};
use crate::error::Result;
use std::fmt;
use tracing::{debug, info, warn};

/// Identifier of a video source (the DOM id in the browser host).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Conventional id of the eye video for `state` (`Idle_eyes`, ...).
    pub fn for_state(state: CharacterState) -> Self {
        let name = match state {
            CharacterState::Idle => "Idle_eyes",
            CharacterState::Thinking => "Thinking_eyes",
            CharacterState::Talking => "Talking_eyes",
        };
        Self(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media readiness, mirroring `HTMLMediaElement.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Whether playback can start without stalling ("canplay").
    pub fn can_play(self) -> bool {
        self >= ReadyState::HaveFutureData
    }
}

/// A video element usable as a live texture source.
pub trait MediaResource: Send {
    fn id(&self) -> &MediaId;

    fn pause(&mut self);

    /// Seek back to the first frame.
    fn rewind(&mut self);

    /// Resume playback.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform refuses playback (autoplay policy,
    /// decode failure).
    fn play(&mut self) -> Result<()>;
}

/// Textures built from the three eye videos, indexed by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCache {
    textures: [TextureHandle; 3],
}

impl TextureCache {
    pub fn get(&self, state: CharacterState) -> TextureHandle {
        self.textures[state.index()]
    }
}

/// The three eye videos plus their cached textures.
pub struct FaceMedia {
    resources: [Box<dyn MediaResource>; 3],
    readiness: [ReadyState; 3],
    textures: Option<TextureCache>,
}

impl FaceMedia {
    pub fn new(
        idle: Box<dyn MediaResource>,
        thinking: Box<dyn MediaResource>,
        talking: Box<dyn MediaResource>,
    ) -> Self {
        Self {
            resources: [idle, thinking, talking],
            readiness: [ReadyState::HaveNothing; 3],
            textures: None,
        }
    }

    /// Pause every video, then restart the one bound to `state` from its first frame.
    ///
    /// Returns the cached texture for `state` once the cache exists.
    pub fn show(&mut self, state: CharacterState) -> Option<TextureHandle> {
        for resource in &mut self.resources {
            resource.pause();
        }
        let selected = &mut self.resources[state.index()];
        selected.rewind();
        if let Err(e) = selected.play() {
            warn!(media = %selected.id(), "eye video refused to play: {e}");
        }
        self.textures.map(|cache| cache.get(state))
    }

    /// Record a readiness report for the video bound to `state`.
    ///
    /// Returns `true` when every video can play and the texture cache has
    /// not been built yet.
    pub fn record_readiness(&mut self, state: CharacterState, level: ReadyState) -> bool {
        let slot = &mut self.readiness[state.index()];
        // Readiness never regresses for our purposes: once playable, a
        // buffering hiccup must not tear the cache down.
        if level > *slot {
            *slot = level;
        }
        debug!(state = %state, ?level, "media readiness");
        self.textures.is_none() && self.all_playable()
    }

    pub fn all_playable(&self) -> bool {
        self.readiness.iter().all(|r| r.can_play())
    }

    pub fn textures(&self) -> Option<TextureCache> {
        self.textures
    }

    /// Build the texture cache. A no-op once the cache exists.
    ///
    /// # Errors
    ///
    /// Returns the first texture creation error; the cache stays empty and a
    /// later readiness report retries.
    pub fn build_textures(&mut self, render: &mut dyn RenderService) -> Result<TextureCache> {
        if let Some(cache) = self.textures {
            return Ok(cache);
        }
        let mut built = Vec::with_capacity(3);
        for resource in &self.resources {
            built.push(render.create_video_texture(resource.id())?);
        }
        let cache = TextureCache {
            textures: [built[0], built[1], built[2]],
        };
        info!("face texture cache built");
        self.textures = Some(cache);
        Ok(cache)
    }
}
