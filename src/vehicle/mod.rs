//! Vehicle side of the relay
//!
//! This module handles:
//! - The connection lifecycle to the vehicle driver
//! - Sequential dispatch of commands to driver operations
//! - Commanded landing on shutdown

mod controller;
mod driver;
#[cfg(test)]
pub(crate) mod mock;
mod tello;

pub use controller::{CommandSender, VehicleController};
pub use driver::VehicleDriver;
pub use tello::{TelloConfig, TelloDriver};
