//! WebSocket connection to the game server
//!
//! - `core`: runtime-agnostic reconnection backoff
//! - `shared`: protocol constants, URL assembly and frame parsing
//! - `desktop`: tokio-tungstenite transport adapter
//! - `manager`: the connection supervisor (connect / reconnect / disconnect)

mod core;
mod desktop;
mod manager;
mod shared;

pub use self::core::BackoffState;
pub use desktop::TungsteniteConnector;
pub use manager::{ConnectionEvent, ConnectionManager, ConnectionSettings, SupervisorEvent};
pub use shared::{
    parse_server_update, session_url, ABNORMAL_CLOSE_CODE, DEFAULT_RECONNECT_DELAY_MS,
    MAX_RETRY_ATTEMPTS, NORMAL_CLOSE_CODE,
};
