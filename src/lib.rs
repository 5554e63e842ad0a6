//! Invader: state core for a voice-driven 3D avatar assistant widget.
//!
//! The widget shows an animated character that answers questions typed or
//! spoken by the user. A reply travels
//! user text → backend webhook → speech output, while the character moves
//! between `Idle`, `Thinking` and `Talking`.
//!
//! # Architecture
//!
//! A single coordinator task owns all mutable state and reacts to typed
//! events:
//! - **Character controller**: visible state, eye-video textures, clip
//!   cross-fades, the speaking flag and the recognition session lifecycle
//! - **Conversation**: user messages, backend requests, reply display
//! - **Gateway**: HTTP webhook to the conversational backend via `reqwest`
//! - **Speech seams**: text-to-speech and speech recognition traits the host
//!   implements; the host bridge ships console stand-ins

pub mod character;
pub mod config;
pub mod error;
pub mod gateway;
pub mod host;
pub mod invader_dirs;
pub mod pipeline;
pub mod runtime;
pub mod session;
pub mod shortcut;
pub mod speech;

#[cfg(test)]
pub(crate) mod test_utils;

pub use character::CharacterState;
pub use config::WidgetConfig;
pub use error::{Result, WidgetError};
pub use pipeline::coordinator::{WidgetCoordinator, WidgetHandle};
pub use pipeline::messages::WidgetStatus;
pub use runtime::RuntimeEvent;
