mod chat;
mod config;
mod relay;
mod signal;
mod vehicle;

use anyhow::{Context, Result};
use chat::{MessageInterpreter, SocketModeClient};
use config::RelayConfig;
use relay::RelayLoop;
use signal::ShutdownSignal;
use std::sync::Arc;
use vehicle::{TelloDriver, VehicleController, VehicleDriver};

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env();

    info!("SkyRelay starting");
    info!("  Drone: {}", config.drone.drone_address);

    let shutdown = ShutdownSignal::install()?;

    // Vehicle side: connects and takes off in the background
    let driver: Arc<dyn VehicleDriver> = Arc::new(TelloDriver::new(config.drone));
    let mut controller = VehicleController::new(driver);
    let outbound = controller.start()?;

    // Chat side
    let interpreter = MessageInterpreter::new(SocketModeClient::new(config.slack));

    let exit = RelayLoop::new(interpreter, outbound).run(shutdown.wait()).await;
    info!("Relay stopped: {:?} (vehicle {:?})", exit, controller.state());

    controller.stop().await.context("drone shutdown failed")?;
    info!("Landed, exiting");
    Ok(())
}
