//! Session service: the single-writer event loop.
//!
//! One task owns the connection manager, the batcher, the reconciler and the
//! timers. Everything that changes the snapshot (inbound updates, fired
//! timers, UI intents) arrives on a channel and is handled in turn, so the
//! snapshot is never written from two places at once. Readers get immutable
//! `Arc<Snapshot>` copies through a `watch` channel, published once per batch.
//!
//! ```text
//! transport -> ConnectionManager -> MessageBatcher -> Reconciler -> watch<Snapshot>
//! ClientHandle -> Intent ----------------------------------^   |
//!                     CommandBus <- Scheduler <- Effect <-------+
//! ```

use std::sync::Arc;

use rpggame_shared::{ClientCommand, ServerUpdate};
use tokio::sync::{mpsc, watch};

use super::message_batcher::MessageBatcher;
use crate::config::ClientConfig;
use crate::infrastructure::messaging::{
    ClientEvent, CommandBus, ConnectionState, ConnectionStateObserver, EventBus,
};
use crate::infrastructure::timers::{Scheduler, TimerFired, TimerKey};
use crate::infrastructure::websocket::{
    ConnectionEvent, ConnectionManager, SupervisorEvent, NORMAL_CLOSE_CODE,
};
use crate::ports::outbound::{AuthProvider, ClockPort, TransportConnector, UpdateObserver};
use crate::state::{ActionMenu, Effect, PendingAction, Reconciler, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No session token available")]
    NotAuthenticated,
    #[error("Session loop has stopped")]
    SessionClosed,
}

/// Requests from the UI to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Connect(String),
    Disconnect,
    Send(ClientCommand),
    /// Send `navigation`, then select `action.value` once its screen shows
    NavigateThenSelect {
        navigation: ClientCommand,
        action: PendingAction,
    },
    SetPendingAction(PendingAction),
    ClearPendingAction,
    SetAutoHunt(bool),
    OpenActionMenu(ActionMenu),
    CloseActionMenu,
    ToggleGroup(u64),
    Shutdown,
}

/// Work carried by a timer
#[derive(Debug, Clone, PartialEq)]
enum TimerAction {
    Send(ClientCommand),
    AutoHunt,
    ExpireFreshness(u64),
    EndSession,
}

/// Cloneable handle the UI uses to drive and observe the session.
#[derive(Clone)]
pub struct ClientHandle {
    intents: mpsc::UnboundedSender<Intent>,
    snapshot: watch::Receiver<Arc<Snapshot>>,
    events: EventBus,
    connection: ConnectionStateObserver,
    auth: Arc<dyn AuthProvider>,
}

impl ClientHandle {
    /// Open a session with the current bearer token.
    pub fn connect(&self) -> Result<(), ClientError> {
        let token = self
            .auth
            .bearer_token()
            .ok_or(ClientError::NotAuthenticated)?;
        self.submit(Intent::Connect(token))
    }

    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.submit(Intent::Disconnect)
    }

    pub fn send_command(&self, command: ClientCommand) -> Result<(), ClientError> {
        self.submit(Intent::Send(command))
    }

    pub fn select(&self, value: impl Into<String>) -> Result<(), ClientError> {
        self.send_command(ClientCommand::select(value))
    }

    pub fn input(&self, value: impl Into<String>) -> Result<(), ClientError> {
        self.send_command(ClientCommand::input(value))
    }

    /// Send `navigation`, then select `value` once the server shows `expect_screen`.
    pub fn navigate_then_select(
        &self,
        navigation: ClientCommand,
        value: impl Into<String>,
        expect_screen: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.submit(Intent::NavigateThenSelect {
            navigation,
            action: PendingAction::new(value, expect_screen),
        })
    }

    pub fn set_pending_action(&self, action: PendingAction) -> Result<(), ClientError> {
        self.submit(Intent::SetPendingAction(action))
    }

    pub fn clear_pending_action(&self) -> Result<(), ClientError> {
        self.submit(Intent::ClearPendingAction)
    }

    pub fn set_auto_hunt(&self, enabled: bool) -> Result<(), ClientError> {
        self.submit(Intent::SetAutoHunt(enabled))
    }

    pub fn open_action_menu(&self, menu: ActionMenu) -> Result<(), ClientError> {
        self.submit(Intent::OpenActionMenu(menu))
    }

    pub fn close_action_menu(&self) -> Result<(), ClientError> {
        self.submit(Intent::CloseActionMenu)
    }

    pub fn toggle_group(&self, group_id: u64) -> Result<(), ClientError> {
        self.submit(Intent::ToggleGroup(group_id))
    }

    /// Stop the session loop, closing any live link.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.submit(Intent::Shutdown)
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Receiver notified once per applied batch
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    fn submit(&self, intent: Intent) -> Result<(), ClientError> {
        self.intents
            .send(intent)
            .map_err(|_| ClientError::SessionClosed)
    }
}

pub struct SessionService {
    config: ClientConfig,
    connection: ConnectionManager,
    connection_events: mpsc::UnboundedReceiver<SupervisorEvent>,
    commands: CommandBus,
    reconciler: Reconciler,
    batcher: MessageBatcher,
    scheduler: Scheduler<TimerAction>,
    timers: mpsc::UnboundedReceiver<TimerFired<TimerAction>>,
    intents: mpsc::UnboundedReceiver<Intent>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    events: EventBus,
    observer: Option<Box<dyn UpdateObserver>>,
}

impl SessionService {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn TransportConnector>,
        auth: Arc<dyn AuthProvider>,
        clock: Arc<dyn ClockPort>,
    ) -> (Self, ClientHandle) {
        let (connection, connection_events) =
            ConnectionManager::new(config.connection_settings(), connector);
        let (scheduler, timers) = Scheduler::new();
        let (intents_tx, intents) = mpsc::unbounded_channel();
        let reconciler = Reconciler::new(clock, config.timings.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(reconciler.snapshot().clone()));
        let events = EventBus::new();

        let handle = ClientHandle {
            intents: intents_tx,
            snapshot: snapshot_rx,
            events: events.clone(),
            connection: connection.state_observer(),
            auth,
        };

        let service = Self {
            config,
            commands: connection.command_bus(),
            connection,
            connection_events,
            reconciler,
            batcher: MessageBatcher::new(),
            scheduler,
            timers,
            intents,
            snapshot_tx,
            events,
            observer: None,
        };
        (service, handle)
    }

    /// Attach a view that is called once per applied update.
    pub fn with_observer(mut self, observer: Box<dyn UpdateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run until `Shutdown` is requested or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Session loop started");

        loop {
            tokio::select! {
                biased;
                intent = self.intents.recv() => match intent {
                    Some(Intent::Shutdown) | None => break,
                    Some(intent) => self.handle_intent(intent).await,
                },
                Some(event) = self.connection_events.recv() => {
                    if self.connection.accepts(&event) {
                        self.handle_connection_event(event.event).await;
                    } else {
                        tracing::trace!(generation = event.generation, "Dropping event from a stopped supervisor");
                    }
                }
                Some(fired) = self.timers.recv() => self.handle_timer(fired).await,
                // Yield once so every frame already buffered joins this batch
                _ = tokio::task::yield_now(), if self.batcher.is_flush_scheduled() => {
                    self.flush_batch();
                }
            }
        }

        self.connection.disconnect();
        self.scheduler.cancel_all();
        tracing::info!("Session loop stopped");
    }

    async fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Connect(token) => {
                // A grace period left over from the previous session must not end this one
                self.scheduler.cancel(TimerKey::SessionEnd);
                if let Err(e) = self.connection.connect(&token) {
                    tracing::error!(error = %e, "Cannot connect");
                }
            }
            Intent::Disconnect => {
                self.flush_pending();
                self.connection.disconnect();
                self.end_session();
                self.events
                    .dispatch(ClientEvent::Disconnected {
                        code: NORMAL_CLOSE_CODE,
                        reconnecting: false,
                    })
                    .await;
            }
            Intent::Send(command) => self.send(&command).await,
            Intent::NavigateThenSelect { navigation, action } => {
                self.scheduler.cancel(TimerKey::PendingAction);
                self.reconciler.set_pending_action(action);
                self.send(&navigation).await;
            }
            Intent::SetPendingAction(action) => {
                self.scheduler.cancel(TimerKey::PendingAction);
                self.reconciler.set_pending_action(action);
            }
            Intent::ClearPendingAction => {
                self.reconciler.clear_pending_action();
                self.scheduler.cancel(TimerKey::PendingAction);
            }
            Intent::SetAutoHunt(enabled) => {
                tracing::info!(enabled, "Auto-hunt toggled");
                for effect in self.reconciler.set_auto_hunt(enabled) {
                    schedule_effect(&mut self.scheduler, effect);
                }
                self.publish();
            }
            Intent::OpenActionMenu(menu) => {
                if self.reconciler.open_action_menu(menu) {
                    self.publish();
                }
            }
            Intent::CloseActionMenu => {
                if self.reconciler.close_action_menu() {
                    self.publish();
                }
            }
            Intent::ToggleGroup(group_id) => {
                if self.reconciler.toggle_group(group_id) {
                    self.publish();
                }
            }
            // Handled by the run loop
            Intent::Shutdown => {}
        }
    }

    async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                self.reconciler.begin_session();
                self.publish();
                self.events.dispatch(ClientEvent::Connected).await;
            }
            ConnectionEvent::Update(update) => {
                if self.batcher.enqueue(*update) {
                    tracing::trace!("Batch flush scheduled");
                }
            }
            ConnectionEvent::Closed { code, reconnecting } => {
                self.events
                    .dispatch(ClientEvent::Disconnected { code, reconnecting })
                    .await;
            }
            ConnectionEvent::ConnectionLost => {
                self.flush_pending();
                self.end_session();
                self.events.dispatch(ClientEvent::ConnectionLost).await;
            }
        }
    }

    async fn handle_timer(&mut self, fired: TimerFired<TimerAction>) {
        let Some(action) = self.scheduler.take_fired(fired) else {
            return;
        };

        match action {
            TimerAction::Send(command) => self.send(&command).await,
            TimerAction::AutoHunt => {
                if self.reconciler.auto_hunt_ready() {
                    let command = self.config.auto_hunt_command.clone();
                    self.send(&command).await;
                } else {
                    tracing::debug!("Auto-hunt fired outside combat, skipping");
                }
            }
            TimerAction::ExpireFreshness(group_id) => {
                if self.reconciler.expire_freshness(group_id) {
                    self.publish();
                }
            }
            TimerAction::EndSession => {
                self.flush_pending();
                self.connection.disconnect();
                self.end_session();
                self.events.dispatch(ClientEvent::SessionEnded).await;
            }
        }
    }

    fn flush_batch(&mut self) {
        let Self {
            batcher,
            reconciler,
            scheduler,
            observer,
            ..
        } = self;

        let report = batcher.flush(|update: ServerUpdate| {
            for effect in reconciler.apply(&update) {
                schedule_effect(scheduler, effect);
            }
            match observer.as_mut() {
                Some(observer) => observer.on_update(&update, reconciler.snapshot()),
                None => Ok(()),
            }
        });

        tracing::debug!(
            applied = report.applied,
            swallowed = report.swallowed,
            failed = report.failed,
            "Applied update batch"
        );
        self.publish();
    }

    /// Apply whatever is queued so a following reset has the last word.
    fn flush_pending(&mut self) {
        if self.batcher.is_flush_scheduled() {
            self.flush_batch();
        }
    }

    fn end_session(&mut self) {
        for key in [
            TimerKey::AutoHunt,
            TimerKey::PendingAction,
            TimerKey::SessionEnd,
        ] {
            self.scheduler.cancel(key);
        }
        self.reconciler.end_session();
        self.publish();
    }

    async fn send(&self, command: &ClientCommand) {
        match self.commands.send(command).await {
            Ok(()) => tracing::debug!(kind = %command.kind, value = %command.value, "Sent command"),
            Err(e) => tracing::warn!(error = %e, kind = %command.kind, "Command not sent"),
        }
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(Arc::new(self.reconciler.snapshot().clone()));
    }
}

fn schedule_effect(scheduler: &mut Scheduler<TimerAction>, effect: Effect) {
    match effect {
        Effect::SendCommand { command, delay } => {
            scheduler.schedule(TimerKey::PendingAction, delay, TimerAction::Send(command));
        }
        Effect::ArmAutoHunt { delay } => {
            scheduler.schedule(TimerKey::AutoHunt, delay, TimerAction::AutoHunt);
        }
        Effect::DisarmAutoHunt => {
            scheduler.cancel(TimerKey::AutoHunt);
        }
        Effect::ExpireFreshness { group_id, delay } => {
            scheduler.schedule(
                TimerKey::Freshness(group_id),
                delay,
                TimerAction::ExpireFreshness(group_id),
            );
        }
        Effect::EndSession { delay } => {
            scheduler.schedule(TimerKey::SessionEnd, delay, TimerAction::EndSession);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::{FakeConnector, FixedClock, ServerEnd};
    use crate::ports::outbound::{ApplyError, MockAuthProvider, MockUpdateObserver, OutboundFrame};
    use crate::state::SessionPhase;
    use serde_json::json;
    use std::future::Future;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    const WAIT: Duration = Duration::from_secs(10);

    fn auth(token: Option<&str>) -> Arc<dyn AuthProvider> {
        let mut auth = MockAuthProvider::new();
        auth.expect_bearer_token()
            .return_const(token.map(str::to_string));
        Arc::new(auth)
    }

    fn service(connector: FakeConnector) -> (SessionService, ClientHandle) {
        SessionService::new(
            ClientConfig::default(),
            Arc::new(connector),
            auth(Some("tok")),
            Arc::new(FixedClock::default()),
        )
    }

    struct Running {
        handle: ClientHandle,
        server: ServerEnd,
        task: JoinHandle<()>,
    }

    async fn start_with(
        service: SessionService,
        handle: ClientHandle,
        mut servers: mpsc::UnboundedReceiver<ServerEnd>,
    ) -> Running {
        let task = tokio::spawn(service.run());
        handle.connect().unwrap();
        let server = servers.recv().await.unwrap();
        wait_for(&handle, |s| s.phase == SessionPhase::InGame).await;
        Running {
            handle,
            server,
            task,
        }
    }

    async fn start() -> Running {
        let (connector, servers) = FakeConnector::accepting();
        let (service, handle) = service(connector);
        start_with(service, handle, servers).await
    }

    async fn wait_for(handle: &ClientHandle, predicate: impl FnMut(&Arc<Snapshot>) -> bool) {
        let mut rx = handle.subscribe();
        tokio::time::timeout(WAIT, rx.wait_for(predicate))
            .await
            .expect("snapshot condition not reached")
            .expect("session loop stopped");
    }

    async fn next_command(server: &mut ServerEnd) -> Option<ClientCommand> {
        let text = tokio::time::timeout(WAIT, server.next_text()).await.ok()??;
        serde_json::from_str(&text).ok()
    }

    fn combat_frame() -> serde_json::Value {
        json!({
            "type": "combat",
            "state": {"screen": "combat", "combat": {"turn": 1, "monster_name": "Wolf"}},
            "options": [{"key": "1", "label": "Attack"}, {"key": "2", "label": "Flee"}]
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_action_fires_after_navigation() {
        let mut run = start().await;

        run.handle
            .navigate_then_select(ClientCommand::select("0"), "10", "main_menu")
            .unwrap();
        assert_eq!(
            next_command(&mut run.server).await,
            Some(ClientCommand::select("0"))
        );

        run.server
            .push_json(json!({
                "type": "menu",
                "state": {"screen": "main_menu"},
                "options": [{"key": "1", "label": "Hunt"}, {"key": "10", "label": "Village"}]
            }))
            .await;
        assert_eq!(
            next_command(&mut run.server).await,
            Some(ClientCommand::select("10"))
        );

        // Consumed: the same screen again sends nothing
        run.server
            .push_json(json!({
                "state": {"screen": "main_menu"},
                "options": [{"key": "10", "label": "Village"}]
            }))
            .await;
        assert_eq!(next_command(&mut run.server).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_combat_log_lifecycle() {
        let run = start().await;

        run.server
            .push_json(json!({"state": {"screen": "combat", "combat": {"turn": 1}}}))
            .await;
        run.server
            .push_json(json!({
                "state": {"screen": "combat", "combat": {"turn": 2}},
                "messages": [{"text": "Hit!", "category": "combat"}]
            }))
            .await;
        wait_for(&run.handle, |s| s.combat_log.len() == 1).await;

        run.server.push_json(json!({"state": {}})).await;
        wait_for(&run.handle, |s| s.combat.is_none()).await;
        assert!(run.handle.snapshot().combat_log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hunt_sends_one_continue_per_quiet_period() {
        let mut run = start().await;
        run.handle.set_auto_hunt(true).unwrap();
        wait_for(&run.handle, |s| s.auto_hunt).await;

        for _ in 0..5 {
            run.server.push_json(combat_frame()).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(
            next_command(&mut run.server).await,
            Some(ClientCommand::select("1"))
        );
        assert_eq!(next_command(&mut run.server).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hunt_turns_off_when_combat_ends() {
        let mut run = start().await;
        run.handle.set_auto_hunt(true).unwrap();
        run.server.push_json(combat_frame()).await;
        wait_for(&run.handle, |s| s.in_combat()).await;

        run.server
            .push_json(json!({
                "state": {"screen": "main_menu"},
                "messages": [{"text": "Victory", "category": "system"}]
            }))
            .await;
        wait_for(&run.handle, |s| !s.auto_hunt).await;

        assert_eq!(next_command(&mut run.server).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_ends_session_after_grace() {
        let mut run = start().await;
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        run.handle
            .events()
            .subscribe(move |event| {
                let _ = event_tx.send(event);
            })
            .await;

        run.server
            .push_json(json!({
                "type": "exit",
                "state": {"player": {"name": "Bob", "level": 2}},
                "messages": [{"text": "Game saved.", "category": "system"}]
            }))
            .await;
        wait_for(&run.handle, |s| s.player.is_some()).await;

        assert!(matches!(
            tokio::time::timeout(WAIT, run.server.from_client.recv()).await,
            Ok(Some(OutboundFrame::Close { code: 1000, .. }))
        ));
        let ended = tokio::time::timeout(WAIT, async {
            while let Some(event) = event_rx.recv().await {
                if event == ClientEvent::SessionEnded {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(ended, Ok(true));

        let snapshot = run.handle.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::CharacterSelect);
        assert!(snapshot.player.is_none());
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(
            run.handle.connection_state(),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_run_future_can_be_spawned() {
        fn spawnable<F: Future + Send + 'static>(_: &F) {}

        let (service, _handle) = service(FakeConnector::refusing());
        let service = service.with_observer(Box::new(MockUpdateObserver::new()));
        spawnable(&service.run());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_discards_frames_still_in_flight() {
        let run = start().await;

        run.server
            .push_json(json!({"state": {"screen": "main_menu", "player": {"name": "Bob"}}}))
            .await;
        run.handle.disconnect().unwrap();

        wait_for(&run.handle, |s| s.phase == SessionPhase::CharacterSelect).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = run.handle.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::CharacterSelect);
        assert!(snapshot.player.is_none());
        assert!(snapshot.screen.is_none());
        assert_eq!(
            run.handle.connection_state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_pending_action_cancels_scheduled_select() {
        let mut run = start().await;

        run.handle
            .set_pending_action(PendingAction::new("10", "main_menu"))
            .unwrap();
        run.server
            .push_json(json!({
                "state": {"screen": "main_menu"},
                "options": [{"key": "10", "label": "Village"}]
            }))
            .await;
        wait_for(&run.handle, |s| s.screen() == Some("main_menu")).await;

        // The select for "10" is armed but has not fired yet
        run.handle
            .set_pending_action(PendingAction::new("3", "town_main"))
            .unwrap();

        assert_eq!(next_command(&mut run.server).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_during_exit_grace_keeps_new_session() {
        let (connector, mut servers) = FakeConnector::accepting();
        let (service, handle) = service(connector);
        let task = tokio::spawn(service.run());

        handle.connect().unwrap();
        let first = servers.recv().await.unwrap();
        wait_for(&handle, |s| s.phase == SessionPhase::InGame).await;

        first
            .push_json(json!({"type": "exit", "state": {"player": {"name": "Bob", "level": 2}}}))
            .await;
        wait_for(&handle, |s| s.player.is_some()).await;

        handle.connect().unwrap();
        let _second = servers.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        assert_eq!(handle.snapshot().phase, SessionPhase::InGame);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_expires_and_groups_toggle() {
        let run = start().await;

        run.server
            .push_json(json!({"messages": [{"text": "A traveller waves", "category": "narrative"}]}))
            .await;
        wait_for(&run.handle, |s| s.history.len() == 1).await;
        let group = run.handle.snapshot().history.latest().cloned().unwrap();
        assert!(group.fresh);

        wait_for(&run.handle, |s| s.history.latest().is_some_and(|g| !g.fresh)).await;

        run.handle.toggle_group(group.id).unwrap();
        wait_for(&run.handle, |s| s.history.latest().is_some_and(|g| !g.collapsed)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_requires_token() {
        let (connector, _servers) = FakeConnector::accepting();
        let (_service, handle) = SessionService::new(
            ClientConfig::default(),
            Arc::new(connector),
            auth(None),
            Arc::new(FixedClock::default()),
        );

        assert!(matches!(handle.connect(), Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lost_returns_to_character_select() {
        let config = ClientConfig {
            reconnect_base_delay: Duration::from_millis(100),
            max_reconnect_attempts: 2,
            ..ClientConfig::default()
        };
        let (service, handle) = SessionService::new(
            config,
            Arc::new(FakeConnector::refusing()),
            auth(Some("tok")),
            Arc::new(FixedClock::default()),
        );
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        handle
            .events()
            .subscribe(move |event| {
                let _ = event_tx.send(event);
            })
            .await;
        let task = tokio::spawn(service.run());

        handle.connect().unwrap();

        let mut seen = Vec::new();
        while let Some(event) = event_rx.recv().await {
            let lost = event == ClientEvent::ConnectionLost;
            seen.push(event);
            if lost {
                break;
            }
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(handle.connection_state(), ConnectionState::Failed);
        assert_eq!(handle.snapshot().phase, SessionPhase::CharacterSelect);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_failure_does_not_stop_batch() {
        let (connector, servers) = FakeConnector::accepting();
        let (service, handle) = service(connector);

        let mut observer = MockUpdateObserver::new();
        let mut calls = 0;
        observer.expect_on_update().times(3).returning(move |_, _| {
            calls += 1;
            match calls {
                1 => Err(ApplyError::Failed("render failed".into())),
                2 => Err(ApplyError::ViewNotReady("list not built".into())),
                _ => Ok(()),
            }
        });
        let service = service.with_observer(Box::new(observer));
        let run = start_with(service, handle, servers).await;

        run.server
            .push_json(json!({"state": {"screen": "town_market"}}))
            .await;
        run.server
            .push_json(json!({"state": {"screen": "quest_log"}}))
            .await;
        run.server
            .push_json(json!({"state": {"screen": "village_main"}}))
            .await;
        wait_for(&run.handle, |s| s.screen() == Some("village_main")).await;

        run.handle.shutdown().unwrap();
        run.task.await.unwrap();
    }
}
