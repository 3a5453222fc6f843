//! RPG Game Protocol - Shared types for server and player communication
//!
//! This crate contains the wire-format types exchanged over the game WebSocket:
//! - Outbound commands (`ClientCommand`)
//! - Inbound update frames (`ServerUpdate`) and the partial state they carry
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Absent means unchanged** - every optional facet is an `Option`, never a
//!    defaulted value that would be indistinguishable from "present but empty"

pub mod messages;
pub mod state;

// =============================================================================
// WebSocket Message Types
// =============================================================================
pub use messages::{
    ClientCommand, CommandKind, GameMessage, MenuOption, MessageCategory, ServerUpdate,
    UpdateKind,
};

// =============================================================================
// State Types
// =============================================================================
pub use state::{
    CombatView, EffectView, GuardView, LocationEntry, OnlinePlayer, OpaqueView, PlayerState,
    StateData,
};
