//! Client-side game state.
//!
//! - `snapshot`: the canonical local mirror of server state
//! - `reconciler`: the single writer that merges updates into the snapshot
//! - `action_chain`: navigate-then-act command sequences
//! - `router`: screen identifier to UI section
//! - `message_log`: bounded combat log and ambient message history

mod action_chain;
mod message_log;
mod reconciler;
mod router;
mod snapshot;

pub use action_chain::{ActionChain, ChainOutcome, PendingAction};
pub use message_log::{
    headline_category, CombatLog, MessageGroup, MessageHistory, COMBAT_LOG_KEEP,
    COMBAT_LOG_TRIM_AT, HISTORY_CAPACITY,
};
pub use reconciler::{Effect, Reconciler};
pub use router::{next_section, Section};
pub use snapshot::{
    ActionMenu, ActiveInput, NarrativeTarget, SessionPhase, Snapshot, COMBAT_SCREEN,
};
