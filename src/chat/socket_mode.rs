//! Slack Socket Mode client
//!
//! Opens a WebSocket through `apps.connections.open`, acknowledges every
//! envelope, and yields the text of plain user messages. Slack refreshes
//! the socket periodically with a `disconnect` envelope; the client then
//! opens a fresh one.

use super::source::MessageSource;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Default Web API base
pub const DEFAULT_API_URL: &str = "https://slack.com/api/";

/// Pause before reopening a socket that dropped
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type SlackSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the Slack connection
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// App-level token (`xapp-...`) with `connections:write`
    pub app_token: String,
    /// Web API base URL, with trailing slash
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            app_token: String::new(),
            api_url: DEFAULT_API_URL.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenConnectionResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

/// Envelope pushed over the socket
#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    #[serde(rename = "type")]
    kind: String,
    envelope_id: Option<String>,
    payload: Option<EventPayload>,
    reason: Option<String>,
    /// Non-zero when Slack re-sends an event it considers unacknowledged
    #[serde(default)]
    retry_attempt: u32,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    event: Option<MessageEvent>,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    subtype: Option<String>,
    bot_id: Option<String>,
}

impl SocketEnvelope {
    /// Text of a plain user message, if this envelope carries one
    fn message_text(&self) -> Option<&str> {
        if self.kind != "events_api" || self.retry_attempt > 0 {
            return None;
        }
        let event = self.payload.as_ref()?.event.as_ref()?;
        if event.kind != "message" || event.subtype.is_some() || event.bot_id.is_some() {
            return None;
        }
        event.text.as_deref()
    }
}

/// Acknowledgement frame for an envelope
fn ack_frame(envelope_id: &str) -> String {
    serde_json::json!({ "envelope_id": envelope_id }).to_string()
}

/// Chat source backed by Slack Socket Mode
pub struct SocketModeClient {
    config: SlackConfig,
    http: reqwest::Client,
    socket: Option<SlackSocket>,
}

impl SocketModeClient {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            socket: None,
        }
    }

    /// Ask Slack for a fresh WebSocket URL
    async fn open_url(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}apps.connections.open", self.config.api_url))
            .bearer_auth(&self.config.app_token)
            .send()
            .await
            .context("apps.connections.open request failed")?
            .error_for_status()?
            .json::<OpenConnectionResponse>()
            .await
            .context("invalid apps.connections.open response")?;

        if !response.ok {
            return Err(anyhow!(
                "apps.connections.open rejected: {}",
                response.error.unwrap_or_else(|| "unknown error".into())
            ));
        }
        response
            .url
            .ok_or_else(|| anyhow!("apps.connections.open returned no url"))
    }

    async fn connect(&self) -> Result<SlackSocket> {
        let url = self.open_url().await?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .context("Socket Mode handshake failed")?;
        info!("[SLACK] Socket Mode connected");
        Ok(socket)
    }

    /// Handle one text frame; returns message text for the relay
    async fn handle_frame(socket: &mut SlackSocket, frame: &str) -> Result<Option<String>> {
        let envelope: SocketEnvelope = match serde_json::from_str(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("[SLACK] Ignoring malformed envelope: {}", e);
                return Ok(None);
            }
        };

        if let Some(id) = &envelope.envelope_id {
            socket.send(Message::Text(ack_frame(id))).await?;
        }

        match envelope.kind.as_str() {
            "hello" => info!("[SLACK] Hello received"),
            "disconnect" => {
                return Err(anyhow!(
                    "server requested reconnect ({})",
                    envelope.reason.as_deref().unwrap_or("no reason")
                ));
            }
            _ if envelope.retry_attempt > 0 => {
                debug!("[SLACK] Skipping redelivery #{}", envelope.retry_attempt)
            }
            other => debug!("[SLACK] Envelope {}", other),
        }

        Ok(envelope.message_text().map(str::to_string))
    }
}

#[async_trait]
impl MessageSource for SocketModeClient {
    async fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            // Failing to open a socket (bad token, no network) is fatal
            let socket = match self.socket.take() {
                Some(socket) => socket,
                None => self.connect().await?,
            };
            let socket = self.socket.insert(socket);

            let outcome = match socket.next().await {
                Some(Ok(Message::Text(frame))) => Self::handle_frame(socket, &frame).await,
                Some(Ok(Message::Close(frame))) => Err(anyhow!("socket closed: {:?}", frame)),
                Some(Ok(_)) => Ok(None),
                Some(Err(e)) => Err(e.into()),
                None => Err(anyhow!("socket ended")),
            };

            match outcome {
                Ok(Some(text)) => return Ok(Some(text)),
                Ok(None) => {}
                Err(e) => {
                    warn!("[SLACK] Reconnecting: {:#}", e);
                    self.socket = None;
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "Slack"
    }
}
