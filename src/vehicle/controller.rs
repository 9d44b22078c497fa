//! Vehicle controller - connection lifecycle, command dispatch, landing

use super::driver::{Direction, FlipDirection, Rotation, VehicleDriver};
use anyhow::Result;
use skyrelay_shared::{motion, relay, Command, ConnectionEvent, ConnectionState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One-way command intake of a started controller
pub type CommandSender = mpsc::Sender<Command>;

/// Errors reported by the controller itself
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("vehicle controller not started")]
    NotStarted,

    #[error("vehicle controller already started")]
    AlreadyStarted,

    #[error("driver failure: {0}")]
    Driver(#[source] anyhow::Error),
}

/// Tasks owned by a started controller
struct Running {
    connector: JoinHandle<()>,
    consumer: JoinHandle<()>,
    stop_tx: oneshot::Sender<()>,
}

/// Drives one vehicle from a stream of commands
pub struct VehicleController {
    driver: Arc<dyn VehicleDriver>,
    state_tx: watch::Sender<ConnectionState>,
    running: Option<Running>,
}

impl VehicleController {
    /// Create a controller; nothing is connected until [`start`](Self::start)
    pub fn new(driver: Arc<dyn VehicleDriver>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            driver,
            state_tx,
            running: None,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Begin connecting and return the command intake.
    ///
    /// Returns immediately; the connection completes in the background.
    pub fn start(&mut self) -> Result<CommandSender, ControllerError> {
        if self.running.is_some() {
            return Err(ControllerError::AlreadyStarted);
        }

        let (command_tx, command_rx) = mpsc::channel::<Command>(relay::CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = oneshot::channel();

        info!("[VEHICLE] Starting {} controller", self.driver.name());

        let connector = tokio::spawn(connection_task(
            self.driver.clone(),
            self.state_tx.clone(),
        ));
        let consumer = tokio::spawn(consume_commands(
            self.driver.clone(),
            command_rx,
            self.state_tx.subscribe(),
            stop_rx,
        ));

        self.running = Some(Running {
            connector,
            consumer,
            stop_tx,
        });

        Ok(command_tx)
    }

    /// Stop dispatching and land the vehicle.
    ///
    /// The intake is closed first. An in-flight driver call finishes and any
    /// command the intake already accepted is executed before landing.
    pub async fn stop(self) -> Result<(), ControllerError> {
        let running = self.running.ok_or(ControllerError::NotStarted)?;

        let _ = running.stop_tx.send(());
        if let Err(e) = running.consumer.await {
            error!("[VEHICLE] Command consumer ended abnormally: {}", e);
        }
        running.connector.abort();

        info!("[VEHICLE] Landing");
        self.driver.land().await.map_err(ControllerError::Driver)
    }
}

/// Apply a transition, logging instead of failing on an illegal one
fn transition(state_tx: &watch::Sender<ConnectionState>, event: ConnectionEvent) {
    state_tx.send_if_modified(|state| match state.next(event) {
        Ok(next) => {
            info!("[VEHICLE] Connection {:?} -> {:?}", state, next);
            *state = next;
            true
        }
        Err(e) => {
            warn!("[VEHICLE] {}", e);
            false
        }
    });
}

/// Connect, take off, then publish readiness
async fn connection_task(driver: Arc<dyn VehicleDriver>, state_tx: watch::Sender<ConnectionState>) {
    transition(&state_tx, ConnectionEvent::ConnectStarted);

    if let Err(e) = driver.connect().await {
        error!("[VEHICLE] Failed to connect to {}: {:#}", driver.name(), e);
        transition(&state_tx, ConnectionEvent::ConnectFailed);
        return;
    }

    info!("[VEHICLE] Connected, taking off");
    if let Err(e) = driver.take_off().await {
        error!("[VEHICLE] Take-off failed: {:#}", e);
    }

    transition(&state_tx, ConnectionEvent::Established);
}

/// Single consumer: one command at a time, in arrival order
async fn consume_commands(
    driver: Arc<dyn VehicleDriver>,
    mut command_rx: mpsc::Receiver<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let command = tokio::select! {
            biased;

            _ = &mut stop_rx => {
                command_rx.close();
                break;
            }
            command = command_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        execute(driver.as_ref(), &state_rx, command).await;
    }

    // Accepted before the intake closed
    while let Some(command) = command_rx.recv().await {
        info!("[VEHICLE] Draining accepted command {}", command);
        execute(driver.as_ref(), &state_rx, command).await;
    }

    info!("[VEHICLE] Command consumer stopped");
}

async fn execute(
    driver: &dyn VehicleDriver,
    state_rx: &watch::Receiver<ConnectionState>,
    command: Command,
) {
    if !state_rx.borrow().is_ready() {
        warn!("[VEHICLE] Dropping {}: vehicle not ready", command);
        return;
    }

    info!("[VEHICLE] Executing command {}", command);
    if let Err(e) = dispatch(driver, command).await {
        error!("[VEHICLE] Command {} failed: {:#}", command, e);
    }
}

/// Issue the single driver operation for a command
async fn dispatch(driver: &dyn VehicleDriver, command: Command) -> Result<()> {
    let distance = motion::MOVE_DISTANCE_CM;
    let degrees = motion::ROTATE_DEGREES;

    match command {
        Command::MoveUp => driver.travel(Direction::Up, distance).await,
        Command::MoveDown => driver.travel(Direction::Down, distance).await,
        Command::MoveLeft => driver.travel(Direction::Left, distance).await,
        Command::MoveRight => driver.travel(Direction::Right, distance).await,
        Command::MoveForward => driver.travel(Direction::Forward, distance).await,
        Command::MoveBackward => driver.travel(Direction::Backward, distance).await,
        Command::RotateClockwise => driver.rotate(Rotation::Clockwise, degrees).await,
        Command::RotateCounterClockwise => {
            driver.rotate(Rotation::CounterClockwise, degrees).await
        }
        Command::Hover => driver.hover().await,
        // A bare "flip" is a front flip
        Command::Flip | Command::FrontFlip => driver.flip(FlipDirection::Front).await,
        Command::RightFlip => driver.flip(FlipDirection::Right).await,
    }
}
