//! Chat side of the relay
//!
//! This module handles:
//! - Reading raw messages from the chat platform
//! - Mapping message text to commands
//! - Exposing a one-way command stream

mod interpreter;
mod socket_mode;
pub(crate) mod source;

pub use interpreter::MessageInterpreter;
pub use socket_mode::{SlackConfig, SocketModeClient};
