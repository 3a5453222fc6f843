//! Desktop WebSocket transport using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::ports::outbound::{
    InboundFrame, OutboundFrame, TransportConnector, TransportError, TransportLink,
};

const LINK_BUFFER: usize = 32;

/// Opens real WebSocket links to the game server
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for TungsteniteConnector {
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError> {
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::info!(host = ?url.host_str(), "Connected to game server");

        let (mut write, mut read) = ws_stream.split();
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundFrame>(LINK_BUFFER);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundFrame>(LINK_BUFFER);

        // Read pump: socket -> inbound channel. Dropping `inbound_tx` without a
        // `Closed` frame tells the supervisor the link died abnormally.
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(InboundFrame::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let code = frame.map(|f| u16::from(f.code));
                        tracing::info!(?code, "Server closed connection");
                        let _ = inbound_tx.send(InboundFrame::Closed(code)).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        });

        // Write pump: outbound channel -> socket
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    OutboundFrame::Text(json) => {
                        if let Err(e) = write.send(Message::Text(json)).await {
                            tracing::error!("Failed to send message: {}", e);
                            break;
                        }
                    }
                    OutboundFrame::Close { code, reason } => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        if let Err(e) = write.send(Message::Close(Some(frame))).await {
                            tracing::debug!("Close frame not delivered: {}", e);
                        }
                        break;
                    }
                }
            }
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
