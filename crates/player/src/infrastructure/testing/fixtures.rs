//! Test fixtures: a channel-backed transport and a fixed clock.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rpggame_shared::ServerUpdate;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::ports::outbound::{
    ClockPort, InboundFrame, OutboundFrame, TransportConnector, TransportError, TransportLink,
};

const FAKE_LINK_BUFFER: usize = 64;

/// The server side of one accepted fake link.
#[derive(Debug)]
pub struct ServerEnd {
    pub url: Url,
    pub to_client: mpsc::Sender<InboundFrame>,
    pub from_client: mpsc::Receiver<OutboundFrame>,
}

impl ServerEnd {
    pub async fn push_text(&self, text: &str) {
        let _ = self.to_client.send(InboundFrame::Text(text.to_string())).await;
    }

    pub async fn push_json(&self, value: serde_json::Value) {
        self.push_text(&value.to_string()).await;
    }

    pub async fn close(&self, code: Option<u16>) {
        let _ = self.to_client.send(InboundFrame::Closed(code)).await;
    }

    /// The session token carried in the connect URL
    pub fn token(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }

    /// Next text frame sent by the client; `None` once it closes the link
    pub async fn next_text(&mut self) -> Option<String> {
        match self.from_client.recv().await? {
            OutboundFrame::Text(text) => Some(text),
            OutboundFrame::Close { .. } => None,
        }
    }
}

/// Transport connector that either refuses every attempt or hands each
/// accepted link's server end to the test.
#[derive(Debug)]
pub struct FakeConnector {
    accepted: Option<mpsc::UnboundedSender<ServerEnd>>,
    attempts: Mutex<Vec<Instant>>,
}

impl FakeConnector {
    pub fn refusing() -> Self {
        Self {
            accepted: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            accepted: Some(tx),
            attempts: Mutex::new(Vec::new()),
        };
        (connector, rx)
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Time between consecutive open attempts
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        let attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        attempts.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl TransportConnector for FakeConnector {
    async fn open(&self, url: &Url) -> Result<TransportLink, TransportError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        let Some(accepted) = &self.accepted else {
            return Err(TransportError::Connect("connection refused".into()));
        };

        let (to_client, inbound) = mpsc::channel(FAKE_LINK_BUFFER);
        let (outbound, from_client) = mpsc::channel(FAKE_LINK_BUFFER);
        let server = ServerEnd {
            url: url.clone(),
            to_client,
            from_client,
        };
        accepted
            .send(server)
            .map_err(|_| TransportError::Connect("test harness gone".into()))?;

        Ok(TransportLink { outbound, inbound })
    }
}

/// Clock frozen at a given instant, advanced by hand
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build a `ServerUpdate` from inline JSON.
///
/// Panics on malformed fixtures; only for use in tests.
#[allow(clippy::expect_used)]
pub fn update(value: serde_json::Value) -> ServerUpdate {
    serde_json::from_value(value).expect("fixture is a valid ServerUpdate")
}
