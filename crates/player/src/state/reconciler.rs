//! State reconciler: merges each inbound update into the snapshot.
//!
//! `apply` is the only writer of the snapshot's server-derived fields. It never
//! touches timers or the transport; anything time-based comes back as an
//! [`Effect`] for the session loop to schedule.

use std::sync::Arc;
use std::time::Duration;

use rpggame_shared::{ClientCommand, PlayerState, ServerUpdate, StateData};

use super::action_chain::{ActionChain, ChainOutcome, PendingAction};
use super::router;
use super::snapshot::{ActionMenu, ActiveInput, NarrativeTarget, SessionPhase, Snapshot};
use crate::config::SessionTimings;
use crate::ports::outbound::ClockPort;

/// Deferred work requested by a reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendCommand {
        command: ClientCommand,
        delay: Duration,
    },
    /// (Re)arm the single auto-hunt continuation
    ArmAutoHunt { delay: Duration },
    DisarmAutoHunt,
    ExpireFreshness { group_id: u64, delay: Duration },
    /// Disconnect and reset the session after a grace period
    EndSession { delay: Duration },
}

pub struct Reconciler {
    snapshot: Snapshot,
    chain: ActionChain,
    clock: Arc<dyn ClockPort>,
    timings: SessionTimings,
}

impl Reconciler {
    pub fn new(clock: Arc<dyn ClockPort>, timings: SessionTimings) -> Self {
        Self {
            snapshot: Snapshot::default(),
            chain: ActionChain::default(),
            clock,
            timings,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.chain.pending()
    }

    /// Merge one update into the snapshot.
    pub fn apply(&mut self, update: &ServerUpdate) -> Vec<Effect> {
        let mut effects = Vec::new();
        let state = update.state.as_ref();

        if let Some(roster) = state.and_then(|s| s.online_players.as_ref()) {
            self.snapshot.online_players = roster.clone();
        }
        if update.is_presence() {
            return effects;
        }

        let push = update.is_push();
        if let Some(state) = state {
            self.merge_state(state, push);
        }

        if !push {
            self.snapshot.input =
                ActiveInput::from_parts(update.options.as_deref(), update.prompt());
        }

        self.route_messages(update, &mut effects);
        self.evaluate_chain(&mut effects);
        self.update_auto_hunt(&mut effects);

        self.snapshot.active_section =
            router::next_section(self.snapshot.active_section, self.snapshot.screen());

        if update.is_terminal() {
            tracing::info!("Server ended the session");
            effects.push(Effect::EndSession {
                delay: self.timings.session_end_delay,
            });
        }

        effects
    }

    fn merge_state(&mut self, state: &StateData, push: bool) {
        if let Some(player) = &state.player {
            let mut incoming = player.clone();
            if let Some(previous) = &self.snapshot.player {
                backfill_locations(&mut incoming, previous);
            }
            self.snapshot.player = Some(incoming);
        }
        if let Some(village) = &state.village {
            self.snapshot.village = Some(village.clone());
        }
        if let Some(town) = &state.town {
            self.snapshot.town = Some(town.clone());
        }
        if let Some(dungeon) = &state.dungeon {
            self.snapshot.dungeon = Some(dungeon.clone());
        }

        // Push updates never move the player between screens or fights
        if push {
            return;
        }

        match &state.combat {
            Some(combat) => self.snapshot.combat = Some(combat.clone()),
            None => {
                if self.snapshot.combat.take().is_some() {
                    tracing::debug!("Combat ended");
                }
                self.snapshot.combat_log.clear();
                self.snapshot.action_menu = None;
            }
        }

        if let Some(screen) = state.screen() {
            self.snapshot.screen = Some(screen.to_string());
        }
    }

    fn route_messages(&mut self, update: &ServerUpdate, effects: &mut Vec<Effect>) {
        let messages: Vec<_> = update
            .messages()
            .iter()
            .filter(|m| !m.is_blank())
            .cloned()
            .collect();
        if messages.is_empty() {
            return;
        }

        match self.snapshot.narrative_target() {
            NarrativeTarget::CombatLog => self.snapshot.combat_log.extend(messages),
            NarrativeTarget::Ambient => {
                let group_id = self.snapshot.history.push(self.clock.now(), messages);
                effects.push(Effect::ExpireFreshness {
                    group_id,
                    delay: self.timings.freshness,
                });
            }
        }
    }

    fn evaluate_chain(&mut self, effects: &mut Vec<Effect>) {
        let Some(screen) = self.snapshot.screen.as_deref() else {
            return;
        };

        match self.chain.evaluate(screen, &self.snapshot.input) {
            ChainOutcome::Fire(command) => {
                tracing::debug!(value = %command.value, screen, "Pending action ready");
                effects.push(Effect::SendCommand {
                    command,
                    delay: self.timings.pending_action_delay,
                });
            }
            ChainOutcome::Discarded(action) => {
                tracing::debug!(value = %action.value, screen, "Pending action discarded");
            }
            ChainOutcome::Idle | ChainOutcome::Waiting => {}
        }
    }

    fn update_auto_hunt(&mut self, effects: &mut Vec<Effect>) {
        if !self.snapshot.auto_hunt {
            return;
        }

        if self.snapshot.on_combat_screen() {
            effects.push(Effect::ArmAutoHunt {
                delay: self.timings.auto_hunt_delay,
            });
        } else if !self.snapshot.in_combat() {
            tracing::info!("Combat over, auto-hunt disabled");
            self.snapshot.auto_hunt = false;
            effects.push(Effect::DisarmAutoHunt);
        }
    }

    // -------------------------------------------------------------------------
    // UI intents
    // -------------------------------------------------------------------------

    pub fn set_pending_action(&mut self, action: PendingAction) {
        if let Some(replaced) = self.chain.set(action) {
            tracing::debug!(value = %replaced.value, "Pending action replaced");
        }
    }

    pub fn clear_pending_action(&mut self) -> Option<PendingAction> {
        self.chain.clear()
    }

    pub fn set_auto_hunt(&mut self, enabled: bool) -> Vec<Effect> {
        self.snapshot.auto_hunt = enabled;
        if !enabled {
            return vec![Effect::DisarmAutoHunt];
        }
        if self.snapshot.on_combat_screen() {
            vec![Effect::ArmAutoHunt {
                delay: self.timings.auto_hunt_delay,
            }]
        } else {
            Vec::new()
        }
    }

    /// Whether a fired auto-hunt timer should still send its command
    pub fn auto_hunt_ready(&self) -> bool {
        self.snapshot.auto_hunt && self.snapshot.on_combat_screen()
    }

    /// Sub-menus only exist during combat. Returns whether the snapshot changed.
    pub fn open_action_menu(&mut self, menu: ActionMenu) -> bool {
        if !self.snapshot.in_combat() || self.snapshot.action_menu == Some(menu) {
            return false;
        }
        self.snapshot.action_menu = Some(menu);
        true
    }

    pub fn close_action_menu(&mut self) -> bool {
        self.snapshot.action_menu.take().is_some()
    }

    pub fn toggle_group(&mut self, group_id: u64) -> bool {
        self.snapshot.history.toggle(group_id)
    }

    pub fn expire_freshness(&mut self, group_id: u64) -> bool {
        self.snapshot.history.expire_freshness(group_id)
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    pub fn begin_session(&mut self) {
        self.snapshot.phase = SessionPhase::InGame;
    }

    /// Drop all session-scoped state (exit signal, lost connection, disconnect)
    pub fn end_session(&mut self) {
        self.chain.clear();
        self.snapshot.reset_session();
    }
}

/// Copy location classification and level ceiling from `previous` into
/// entries of `incoming` that lack them, matching by name.
fn backfill_locations(incoming: &mut PlayerState, previous: &PlayerState) {
    let known: Vec<_> = previous
        .known_locations
        .iter()
        .flatten()
        .chain(previous.locked_locations.iter().flatten())
        .collect();
    if known.is_empty() {
        return;
    }

    let entries = incoming
        .known_locations
        .iter_mut()
        .flatten()
        .chain(incoming.locked_locations.iter_mut().flatten());
    for entry in entries {
        if entry.kind.is_some() && entry.level_max.is_some() {
            continue;
        }
        let Some(prior) = known.iter().find(|p| p.name == entry.name) else {
            continue;
        };
        if entry.kind.is_none() {
            entry.kind = prior.kind.clone();
        }
        if entry.level_max.is_none() {
            entry.level_max = prior.level_max;
        }
    }
}
