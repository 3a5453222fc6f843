//! Transport Port - opens one duplex link to the game server
//!
//! A link is a pair of channels. The adapter owns the actual socket and pumps
//! frames between it and the channels, so the connection supervisor never
//! touches a platform socket type directly.

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// Frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text payload (expected to be one JSON update)
    Text(String),
    /// The server closed the link, with its close code if one was sent
    Closed(Option<u16>),
}

/// Frame sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// An open link. Dropping the inbound sender on the adapter side means the
/// link ended without a close handshake.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub inbound: mpsc::Receiver<InboundFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to connect: {0}")]
    Connect(String),
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a link to `url`. Resolves once the handshake completes.
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError>;
}
