//! Seam to the 3D render service.
//!
//! The scene graph, mixer and per-frame loop live outside this crate. The
//! controller only ever asks for three things: build a texture from a video
//! source, put a texture on the face material, and change the active clip.

use crate::character::media::MediaId;
use crate::error::Result;
use std::time::Duration;

/// Opaque handle to a texture owned by the render service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// How the requested clip enters.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipTransition {
    /// First clip ever played: fade in from the bind pose.
    FadeIn { duration: Duration },
    /// Blend out of `from` while the new clip fades in.
    CrossFade { from: String, duration: Duration },
}

/// Request to make `clip` the active animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub clip: String,
    pub transition: ClipTransition,
}

impl ClipRequest {
    /// Blend duration regardless of transition kind.
    pub fn blend(&self) -> Duration {
        match &self.transition {
            ClipTransition::FadeIn { duration } | ClipTransition::CrossFade { duration, .. } => {
                *duration
            }
        }
    }
}

/// Render service commands used by the character controller.
///
/// Implementations must not block: they are called from the event loop and
/// only enqueue work for the next rendered frame.
pub trait RenderService: Send {
    /// Build a live texture sampling the given video source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unknown or texture creation fails.
    fn create_video_texture(&mut self, media: &MediaId) -> Result<TextureHandle>;

    /// Bind `texture` to the face material.
    fn set_face_texture(&mut self, texture: TextureHandle);

    /// Transition the skeleton to `request.clip`. Unknown clips are ignored.
    fn play_clip(&mut self, request: &ClipRequest);
}
