//! Command Bus and Event Bus messaging infrastructure.
//!
//! - `CommandBus`: send commands on whichever link is open
//! - `EventBus`: push lifecycle events to subscribers
//! - `ConnectionState`: lifecycle state shared through an atomic
//!
//! The connection supervisor (in the websocket module) attaches links to the
//! command bus and drives the connection state.

pub mod command_bus;
pub mod connection;
pub mod event_bus;

pub use command_bus::{CommandBus, CommandError};
pub use connection::{set_connection_state, ConnectionState, ConnectionStateObserver};
pub use event_bus::{ClientEvent, EventBus};
