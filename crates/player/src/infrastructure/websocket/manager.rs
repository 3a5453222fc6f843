//! Connection supervisor.
//!
//! One supervisor task per `connect` call owns the live link, forwards parsed
//! updates in arrival order, and reconnects with linear backoff after abnormal
//! closures. Cancelling the supervisor closes its link with the normal code.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::time::Duration;

use rpggame_shared::ServerUpdate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::core::BackoffState;
use super::shared::{parse_server_update, session_url, ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE};
use crate::infrastructure::messaging::{
    set_connection_state, CommandBus, ConnectionState, ConnectionStateObserver,
};
use crate::ports::outbound::{
    InboundFrame, OutboundFrame, TransportConnector, TransportError, TransportLink,
};

const CLIENT_CLOSE_REASON: &str = "client disconnect";

/// Where and how persistently to connect.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub server_url: String,
    pub base_delay: Duration,
    pub max_attempts: u32,
}

/// What the supervisor reports to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    Update(Box<ServerUpdate>),
    /// A link closed (or failed to open, reported as 1006)
    Closed { code: u16, reconnecting: bool },
    /// Retry budget exhausted; no further attempts will be made
    ConnectionLost,
}

/// A [`ConnectionEvent`] stamped with the `connect` call that produced it.
///
/// Events a supervisor emitted before it was cancelled can still be queued;
/// [`ConnectionManager::accepts`] tells them apart from the live ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorEvent {
    pub generation: u64,
    pub event: ConnectionEvent,
}

struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ConnectionManager {
    settings: ConnectionSettings,
    connector: Arc<dyn TransportConnector>,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    state: Arc<AtomicU8>,
    commands: CommandBus,
    supervisor: Option<SupervisorHandle>,
    generation: u64,
}

impl ConnectionManager {
    pub fn new(
        settings: ConnectionSettings,
        connector: Arc<dyn TransportConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            settings,
            connector,
            events,
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8())),
            commands: CommandBus::new(),
            supervisor: None,
            generation: 0,
        };
        (manager, events_rx)
    }

    /// Open a session for `token`, replacing any link that is already live.
    pub fn connect(&mut self, token: &str) -> Result<(), TransportError> {
        let url = session_url(&self.settings.server_url, token)?;
        self.stop_supervisor();

        self.generation += 1;
        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            url,
            connector: Arc::clone(&self.connector),
            backoff: BackoffState::new(self.settings.base_delay, self.settings.max_attempts),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            commands: self.commands.clone(),
            generation: self.generation,
            cancel: cancel.clone(),
        };
        tracing::info!(generation = self.generation, "Starting connection supervisor");
        let task = tokio::spawn(supervisor.run());
        self.supervisor = Some(SupervisorHandle { cancel, task });
        Ok(())
    }

    /// Close the live link with the normal code. No reconnection follows.
    pub fn disconnect(&mut self) {
        if self.stop_supervisor() {
            tracing::info!("Disconnected from game server");
        }
        set_connection_state(&self.state, ConnectionState::Disconnected);
    }

    pub fn state_observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.state))
    }

    pub fn command_bus(&self) -> CommandBus {
        self.commands.clone()
    }

    /// The event came from the supervisor that is still in charge.
    /// Everything emitted before a `disconnect` or a replacing `connect` is stale.
    pub fn accepts(&self, event: &SupervisorEvent) -> bool {
        self.supervisor.is_some() && event.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.supervisor
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    fn stop_supervisor(&mut self) -> bool {
        match self.supervisor.take() {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop_supervisor();
    }
}

struct Supervisor {
    url: Url,
    connector: Arc<dyn TransportConnector>,
    backoff: BackoffState,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    state: Arc<AtomicU8>,
    commands: CommandBus,
    generation: u64,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);

            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.connector.open(&self.url) => result,
            };

            let code = match opened {
                Ok(link) => {
                    self.backoff.reset();
                    self.commands.attach(self.generation, link.outbound.clone()).await;
                    self.set_state(ConnectionState::Connected);
                    self.emit(ConnectionEvent::Opened);

                    let code = self.pump(link).await;
                    self.commands.detach(self.generation).await;
                    code
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt = self.backoff.attempts(), "Connection attempt failed");
                    ABNORMAL_CLOSE_CODE
                }
            };

            if self.cancel.is_cancelled() {
                return;
            }

            if code == NORMAL_CLOSE_CODE {
                tracing::info!("Connection closed normally");
                self.set_state(ConnectionState::Disconnected);
                self.emit(ConnectionEvent::Closed {
                    code,
                    reconnecting: false,
                });
                return;
            }

            let Some(delay) = self.backoff.next_delay_and_advance() else {
                tracing::warn!(
                    attempts = self.backoff.max_attempts(),
                    "Giving up on reconnecting"
                );
                self.set_state(ConnectionState::Failed);
                self.emit(ConnectionEvent::Closed {
                    code,
                    reconnecting: false,
                });
                self.emit(ConnectionEvent::ConnectionLost);
                return;
            };

            tracing::warn!(
                code,
                attempt = self.backoff.attempts(),
                max_attempts = self.backoff.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                "Connection lost, scheduling reconnect"
            );
            self.emit(ConnectionEvent::Closed {
                code,
                reconnecting: true,
            });
            self.set_state(ConnectionState::Reconnecting);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Forward inbound frames until the link ends; returns the close code.
    async fn pump(&self, link: TransportLink) -> u16 {
        let TransportLink {
            outbound,
            mut inbound,
        } = link;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let close = OutboundFrame::Close {
                        code: NORMAL_CLOSE_CODE,
                        reason: CLIENT_CLOSE_REASON.to_string(),
                    };
                    if outbound.send(close).await.is_err() {
                        tracing::debug!("Link already gone while closing");
                    }
                    return NORMAL_CLOSE_CODE;
                }
                frame = inbound.recv() => match frame {
                    Some(InboundFrame::Text(text)) => match parse_server_update(&text) {
                        Ok(update) => self.emit(ConnectionEvent::Update(Box::new(update))),
                        Err(e) => {
                            tracing::warn!(error = %e, len = text.len(), "Dropping malformed frame");
                        }
                    },
                    Some(InboundFrame::Closed(code)) => {
                        return code.unwrap_or(ABNORMAL_CLOSE_CODE);
                    }
                    None => return ABNORMAL_CLOSE_CODE,
                },
            }
        }
    }

    // A cancelled supervisor is being replaced; it must not clobber the
    // state or events of its successor.
    fn set_state(&self, state: ConnectionState) {
        if !self.cancel.is_cancelled() {
            set_connection_state(&self.state, state);
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        let event = SupervisorEvent {
            generation: self.generation,
            event,
        };
        if self.events.send(event).is_err() {
            tracing::debug!("Connection event receiver dropped");
        }
    }
}
