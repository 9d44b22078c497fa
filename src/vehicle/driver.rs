//! Driver trait abstraction for pluggable vehicle backends

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Directional move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
}

/// Yaw rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Flip maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Front,
    Back,
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        };
        f.write_str(name)
    }
}

/// A vehicle that accepts discrete motion operations.
///
/// Implementations serialize their own request/response traffic; callers may
/// hold the driver behind an `Arc` and call it from several tasks.
#[async_trait]
pub trait VehicleDriver: Send + Sync + 'static {
    /// Establish the link; returns once the vehicle confirmed the connection
    async fn connect(&self) -> Result<()>;

    async fn take_off(&self) -> Result<()>;

    async fn land(&self) -> Result<()>;

    /// Move in a direction by a fixed distance
    async fn travel(&self, direction: Direction, distance_cm: u32) -> Result<()>;

    async fn rotate(&self, rotation: Rotation, degrees: u32) -> Result<()>;

    /// Hold position
    async fn hover(&self) -> Result<()>;

    async fn flip(&self, direction: FlipDirection) -> Result<()>;

    /// Human-readable name for this driver
    fn name(&self) -> &'static str;
}
