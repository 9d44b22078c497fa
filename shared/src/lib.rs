//! SkyRelay Shared Types
//!
//! This crate provides the command vocabulary and the vehicle connection
//! state machine shared by the chat side and the vehicle side of the relay.

pub mod command;
pub mod state_machine;

// Re-export commonly used types at crate root
pub use command::Command;
pub use state_machine::{ConnectionEvent, ConnectionState, TransitionError};

/// Fixed magnitudes applied by the vehicle controller
pub mod motion {
    /// Distance of a single directional move in centimetres
    pub const MOVE_DISTANCE_CM: u32 = 20;

    /// Angle of a single rotation in degrees
    pub const ROTATE_DEGREES: u32 = 10;
}

/// Channel sizing for the relay pipeline
pub mod relay {
    /// Capacity of every hand-off channel between tasks
    pub const CHANNEL_CAPACITY: usize = 1;
}
