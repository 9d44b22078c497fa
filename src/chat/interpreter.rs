//! Message interpreter - turns chat text into commands

use super::source::MessageSource;
use skyrelay_shared::{relay, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Owns the chat reader and exposes the resulting command stream
pub struct MessageInterpreter {
    commands_rx: mpsc::Receiver<Command>,
    reader: JoinHandle<()>,
    interpreter: JoinHandle<()>,
}

impl MessageInterpreter {
    /// Start reading from `source` in the background
    pub fn new<S: MessageSource>(source: S) -> Self {
        let (raw_tx, raw_rx) = mpsc::channel::<String>(relay::CHANNEL_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel::<Command>(relay::CHANNEL_CAPACITY);

        let reader = tokio::spawn(read_messages(source, raw_tx));
        let interpreter = tokio::spawn(interpret_messages(raw_rx, commands_tx));

        Self {
            commands_rx,
            reader,
            interpreter,
        }
    }

    /// Receive the next command; `None` once the chat source has ended
    pub async fn recv(&mut self) -> Option<Command> {
        self.commands_rx.recv().await
    }
}

impl Drop for MessageInterpreter {
    fn drop(&mut self) {
        self.reader.abort();
        self.interpreter.abort();
    }
}

/// Pull raw messages off the chat source
async fn read_messages<S: MessageSource>(mut source: S, raw_tx: mpsc::Sender<String>) {
    info!("[CHAT] Reading messages from {}", source.name());

    loop {
        match source.next_message().await {
            Ok(Some(text)) => {
                if raw_tx.send(text).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                info!("[CHAT] {} closed", source.name());
                break;
            }
            Err(e) => {
                error!("[CHAT] {} failed: {:#}", source.name(), e);
                break;
            }
        }
    }
}

/// Map each raw message to at most one command
async fn interpret_messages(
    mut raw_rx: mpsc::Receiver<String>,
    commands_tx: mpsc::Sender<Command>,
) {
    while let Some(text) = raw_rx.recv().await {
        info!("[CHAT] Handling message {:?}", text);

        let Some(command) = Command::from_phrase(&text) else {
            debug!("[CHAT] No command for {:?}", text);
            continue;
        };

        if commands_tx.send(command).await.is_err() {
            break;
        }
    }
}
