//! Headless host integration: a JSON command/event protocol over stdio and
//! console stand-ins for the browser collaborators.

pub mod console;
pub mod contract;
pub mod handler;
pub mod stdio;
