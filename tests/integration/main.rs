#![allow(clippy::unwrap_used, clippy::expect_used)]

mod conversation_flow;
mod error_recovery;
mod gateway_contract;
