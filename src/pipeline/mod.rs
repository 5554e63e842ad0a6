//! Event-driven core: the controller, the conversation and the loop that
//! owns them.

pub mod controller;
pub mod coordinator;
pub mod messages;
pub mod orchestrator;
pub mod timers;
