//! Message source trait abstraction for pluggable chat backends

use anyhow::Result;
use async_trait::async_trait;

/// A stream of raw chat message bodies
#[async_trait]
pub trait MessageSource: Send + 'static {
    /// Wait for the next message body; `Ok(None)` once the source is closed
    async fn next_message(&mut self) -> Result<Option<String>>;

    /// Human-readable name for this source
    fn name(&self) -> &'static str;
}
