//! Command Bus for sending commands to the game server.
//!
//! The bus writes into whichever link is currently open. It is cheap to clone
//! and survives reconnects; the supervisor attaches each new link and detaches
//! it when the link ends.

use std::sync::Arc;

use rpggame_shared::ClientCommand;
use tokio::sync::{mpsc, Mutex};

use crate::ports::outbound::OutboundFrame;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No link is open; commands are not queued across reconnects
    #[error("Not connected to server")]
    NotConnected,
    #[error("Failed to send command: {0}")]
    SendFailed(String),
    #[error("Failed to serialize command: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug)]
struct AttachedLink {
    generation: u64,
    tx: mpsc::Sender<OutboundFrame>,
}

/// Command bus for sending commands to the game server.
#[derive(Debug, Clone, Default)]
pub struct CommandBus {
    link: Arc<Mutex<Option<AttachedLink>>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and send a command on the open link.
    pub async fn send(&self, command: &ClientCommand) -> Result<(), CommandError> {
        let json = serde_json::to_string(command)?;
        self.send_frame(OutboundFrame::Text(json)).await
    }

    pub(crate) async fn send_frame(&self, frame: OutboundFrame) -> Result<(), CommandError> {
        // Clone the sender to avoid holding the lock across await
        let tx = {
            let link = self.link.lock().await;
            link.as_ref().map(|l| l.tx.clone())
        };
        let Some(tx) = tx else {
            return Err(CommandError::NotConnected);
        };
        tx.send(frame)
            .await
            .map_err(|_| CommandError::SendFailed("link closed".into()))
    }

    pub async fn is_attached(&self) -> bool {
        self.link.lock().await.is_some()
    }

    pub(crate) async fn attach(&self, generation: u64, tx: mpsc::Sender<OutboundFrame>) {
        *self.link.lock().await = Some(AttachedLink { generation, tx });
    }

    /// Detach the link opened under `generation`; a newer link is left alone.
    pub(crate) async fn detach(&self, generation: u64) {
        let mut link = self.link.lock().await;
        if link.as_ref().is_some_and(|l| l.generation == generation) {
            *link = None;
        }
    }
}
