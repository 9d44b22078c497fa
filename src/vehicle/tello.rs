//! Tello text-SDK driver over UDP
//!
//! Every operation is one SDK command string answered by one reply datagram
//! (`ok`, `error ...`, or a value for read commands).

use super::driver::{Direction, FlipDirection, Rotation, VehicleDriver};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default SDK address of a Tello in access-point mode
pub const DEFAULT_TELLO_ADDRESS: &str = "192.168.10.1:8889";

/// Delay between SDK handshake attempts
const HANDSHAKE_RETRY: Duration = Duration::from_secs(2);

/// Longest a single maneuver reply may take (a full-range move is slow)
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for the Tello link
#[derive(Debug, Clone)]
pub struct TelloConfig {
    /// Local UDP port to bind; `0` picks an ephemeral port
    pub local_port: String,
    /// SDK address of the drone
    pub drone_address: String,
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self {
            local_port: "0".into(),
            drone_address: DEFAULT_TELLO_ADDRESS.into(),
        }
    }
}

/// Tello driver speaking the plain-text SDK
pub struct TelloDriver {
    config: TelloConfig,
    /// Bound socket, present once the handshake succeeded
    socket: Mutex<Option<UdpSocket>>,
}

impl TelloDriver {
    pub fn new(config: TelloConfig) -> Self {
        Self {
            config,
            socket: Mutex::new(None),
        }
    }

    /// Send one SDK command and wait for its reply.
    ///
    /// Replies carry no request id, so a reply that misses its window must
    /// never be read as the answer to a later command. On timeout the socket
    /// is replaced and the late reply lands on the closed one.
    async fn request(&self, command: &str) -> Result<()> {
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Tello not connected"))?;

        discard_pending(socket);
        debug!("[TELLO] -> {}", command);
        socket.send(command.as_bytes()).await?;

        let reply = match timeout(RESPONSE_TIMEOUT, recv_reply(socket)).await {
            Ok(reply) => reply?,
            Err(_) => {
                guard.take();
                warn!("[TELLO] No reply to '{}', reopening socket", command);
                *guard = Some(self.open_socket().await?);
                return Err(anyhow!("Tello did not answer '{}'", command));
            }
        };
        debug!("[TELLO] <- {}", reply);

        check_reply(command, &reply)
    }

    /// Bind the local socket and point it at the drone
    async fn open_socket(&self) -> Result<UdpSocket> {
        let bind_addr = format!("0.0.0.0:{}", self.config.local_port);
        let socket = UdpSocket::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", bind_addr))?;
        socket
            .connect(&self.config.drone_address)
            .await
            .with_context(|| format!("failed to reach {}", self.config.drone_address))?;
        Ok(socket)
    }
}

/// Drop datagrams already queued on the socket
fn discard_pending(socket: &UdpSocket) {
    let mut buf = [0u8; 1024];
    while let Ok(n) = socket.try_recv(&mut buf) {
        debug!(
            "[TELLO] Discarding stale reply: {}",
            String::from_utf8_lossy(&buf[..n]).trim()
        );
    }
}

async fn recv_reply(socket: &UdpSocket) -> Result<String> {
    let mut buf = [0u8; 1024];
    let n = socket.recv(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf[..n]).trim().to_string())
}

/// Map an SDK reply to success or a rejection
fn check_reply(command: &str, reply: &str) -> Result<()> {
    if reply.to_ascii_lowercase().starts_with("error") {
        return Err(anyhow!("Tello rejected '{}': {}", command, reply));
    }
    Ok(())
}

fn travel_command(direction: Direction, distance_cm: u32) -> String {
    let verb = match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Left => "left",
        Direction::Right => "right",
        Direction::Forward => "forward",
        Direction::Backward => "back",
    };
    format!("{} {}", verb, distance_cm)
}

fn rotate_command(rotation: Rotation, degrees: u32) -> String {
    match rotation {
        Rotation::Clockwise => format!("cw {}", degrees),
        Rotation::CounterClockwise => format!("ccw {}", degrees),
    }
}

fn flip_command(direction: FlipDirection) -> &'static str {
    match direction {
        FlipDirection::Front => "flip f",
        FlipDirection::Back => "flip b",
        FlipDirection::Left => "flip l",
        FlipDirection::Right => "flip r",
    }
}

#[async_trait]
impl VehicleDriver for TelloDriver {
    async fn connect(&self) -> Result<()> {
        info!("[TELLO] Connecting to {}...", self.config.drone_address);

        // Each attempt gets its own socket so a late reply to an earlier
        // attempt cannot answer a later command
        let socket = loop {
            let socket = self.open_socket().await?;
            socket.send(b"command").await?;
            match timeout(HANDSHAKE_RETRY, recv_reply(&socket)).await {
                Ok(Ok(reply)) if check_reply("command", &reply).is_ok() => break socket,
                Ok(Ok(reply)) => warn!("[TELLO] Handshake refused: {}", reply),
                // ICMP port unreachable shows up as a recv error on a connected socket
                Ok(Err(e)) => warn!("[TELLO] Handshake failed: {}", e),
                Err(_) => debug!("[TELLO] No handshake reply yet"),
            }
            drop(socket);
            tokio::time::sleep(HANDSHAKE_RETRY).await;
        };

        discard_pending(&socket);
        info!("[TELLO] SDK mode enabled");
        *self.socket.lock().await = Some(socket);
        Ok(())
    }

    async fn take_off(&self) -> Result<()> {
        self.request("takeoff").await
    }

    async fn land(&self) -> Result<()> {
        self.request("land").await
    }

    async fn travel(&self, direction: Direction, distance_cm: u32) -> Result<()> {
        self.request(&travel_command(direction, distance_cm)).await
    }

    async fn rotate(&self, rotation: Rotation, degrees: u32) -> Result<()> {
        self.request(&rotate_command(rotation, degrees)).await
    }

    async fn hover(&self) -> Result<()> {
        self.request("stop").await
    }

    async fn flip(&self, direction: FlipDirection) -> Result<()> {
        self.request(flip_command(direction)).await
    }

    fn name(&self) -> &'static str {
        "Tello"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Answers every datagram with `reply` and reports what it received
    async fn fake_tello(reply: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
        slow_tello(|_| reply, Duration::ZERO).await
    }

    /// Answers each datagram with `respond(command)` after `delay`
    async fn slow_tello(
        respond: impl Fn(&str) -> &'static str + Send + 'static,
        delay: Duration,
    ) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
                let command = String::from_utf8_lossy(&buf[..n]).to_string();
                let reply = respond(&command);
                let _ = tx.send(command);

                let socket = socket.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = socket.send_to(reply.as_bytes(), peer).await;
                });
            }
        });

        (addr, rx)
    }

    fn driver_for(addr: SocketAddr) -> TelloDriver {
        TelloDriver::new(TelloConfig {
            local_port: "0".into(),
            drone_address: addr.to_string(),
        })
    }

    #[test]
    fn test_default_config() {
        let config = TelloConfig::default();
        assert_eq!(config.drone_address, "192.168.10.1:8889");
        assert_eq!(config.local_port, "0");
    }

    #[test]
    fn test_sdk_command_strings() {
        assert_eq!(travel_command(Direction::Up, 20), "up 20");
        assert_eq!(travel_command(Direction::Backward, 20), "back 20");
        assert_eq!(rotate_command(Rotation::Clockwise, 10), "cw 10");
        assert_eq!(rotate_command(Rotation::CounterClockwise, 10), "ccw 10");
        assert_eq!(flip_command(FlipDirection::Front), "flip f");
        assert_eq!(flip_command(FlipDirection::Right), "flip r");
    }

    #[test]
    fn test_reply_parsing() {
        assert!(check_reply("up 20", "ok").is_ok());
        assert!(check_reply("up 20", "error Not joystick").is_err());
        assert!(check_reply("up 20", "ERROR").is_err());
        // Read commands answer with a value
        assert!(check_reply("battery?", "87").is_ok());
    }

    #[tokio::test]
    async fn test_commands_before_connect_fail() {
        let driver = TelloDriver::new(TelloConfig::default());
        let err = driver.land().await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn test_session_against_fake_tello() {
        let (addr, mut received) = fake_tello("ok").await;
        let driver = driver_for(addr);

        driver.connect().await.unwrap();
        driver.take_off().await.unwrap();
        driver.travel(Direction::Forward, 20).await.unwrap();
        driver.rotate(Rotation::CounterClockwise, 10).await.unwrap();
        driver.hover().await.unwrap();
        driver.flip(FlipDirection::Right).await.unwrap();
        driver.land().await.unwrap();

        let mut sent = Vec::new();
        while let Ok(command) = received.try_recv() {
            sent.push(command);
        }
        assert_eq!(
            sent,
            vec!["command", "takeoff", "forward 20", "ccw 10", "stop", "flip r", "land"]
        );
    }

    #[tokio::test]
    async fn test_rejection_is_surfaced() {
        let (addr, _received) = fake_tello("error").await;
        let driver = driver_for(addr);

        // Handshake keeps retrying on refusal; install the socket directly
        *driver.socket.lock().await = Some(driver.open_socket().await.unwrap());

        let err = driver.take_off().await.unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[tokio::test]
    async fn test_default_port_binds_ephemeral() {
        let driver = TelloDriver::new(TelloConfig {
            drone_address: "127.0.0.1:8889".into(),
            ..TelloConfig::default()
        });
        let socket = driver.open_socket().await.unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_late_handshake_reply_does_not_answer_takeoff() {
        // Slower than the handshake retry, so `command` is sent twice
        let (addr, mut received) = slow_tello(
            |command| match command {
                "takeoff" => "error Motor stop",
                _ => "ok",
            },
            HANDSHAKE_RETRY + Duration::from_millis(500),
        )
        .await;
        let driver = driver_for(addr);

        driver.connect().await.unwrap();
        let err = driver.take_off().await.unwrap_err();
        assert!(err.to_string().contains("Motor stop"));

        let mut sent = Vec::new();
        while let Ok(command) = received.try_recv() {
            sent.push(command);
        }
        assert_eq!(sent, vec!["command", "command", "takeoff"]);
    }

    #[tokio::test]
    async fn test_stale_datagram_is_discarded() {
        let (addr, _received) = slow_tello(
            |command| match command {
                "land" => "error Not flying",
                _ => "ok",
            },
            Duration::ZERO,
        )
        .await;
        let driver = driver_for(addr);
        driver.connect().await.unwrap();

        // An unsolicited reply queued ahead of the next command
        {
            let guard = driver.socket.lock().await;
            let socket = guard.as_ref().unwrap();
            socket.send(b"stop").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let err = driver.land().await.unwrap_err();
        assert!(err.to_string().contains("Not flying"));
    }
}
