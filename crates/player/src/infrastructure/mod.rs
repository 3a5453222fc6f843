//! Infrastructure adapters: transport, messaging, timers and platform ports.

pub mod messaging;
pub mod platform;
pub mod timers;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export messaging types
pub use messaging::{
    ClientEvent, CommandBus, CommandError, ConnectionState, ConnectionStateObserver, EventBus,
};
