//! Player client crate.
//!
//! Holds the connection and state-reconciliation engine that keeps a local
//! snapshot of the server-authoritative game state, plus the infrastructure
//! adapters it runs on.

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod state;

// Re-export commonly used entrypoints
pub use application::services::{ClientError, ClientHandle, SessionService};
pub use config::ClientConfig;
pub use infrastructure::messaging::ClientEvent;
pub use state::{Section, Snapshot};
