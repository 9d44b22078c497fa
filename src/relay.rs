//! Relay loop - forwards chat commands to the vehicle until told to stop

use crate::chat::MessageInterpreter;
use crate::vehicle::CommandSender;
use std::future::Future;
use tracing::{debug, info, warn};

/// Why the relay loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// Termination signal received
    Shutdown,
    /// The chat side stopped producing commands
    InboundClosed,
    /// The vehicle controller no longer accepts commands
    OutboundClosed,
}

/// Top-level coordinator between the interpreter and the controller
pub struct RelayLoop {
    inbound: MessageInterpreter,
    outbound: CommandSender,
}

impl RelayLoop {
    pub fn new(inbound: MessageInterpreter, outbound: CommandSender) -> Self {
        Self { inbound, outbound }
    }

    /// Forward commands until `shutdown` resolves or a channel closes.
    ///
    /// The shutdown future is polled first on every iteration. A forward
    /// waits for the controller to accept the command and is not interrupted
    /// by shutdown.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> RelayExit {
        tokio::pin!(shutdown);

        let exit = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break RelayExit::Shutdown,
                command = self.inbound.recv() => {
                    let Some(command) = command else {
                        break RelayExit::InboundClosed;
                    };

                    debug!("[RELAY] Forwarding {}", command);
                    if self.outbound.send(command).await.is_err() {
                        break RelayExit::OutboundClosed;
                    }
                }
            }
        };

        match exit {
            RelayExit::Shutdown => info!("[RELAY] Termination signal received"),
            RelayExit::InboundClosed => warn!("[RELAY] Chat stream ended"),
            RelayExit::OutboundClosed => warn!("[RELAY] Vehicle intake closed"),
        }
        exit
    }
}
