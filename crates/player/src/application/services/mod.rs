//! Application services
//!
//! - `message_batcher`: groups same-tick updates into one ordered batch
//! - `session_service`: the event loop that owns the snapshot, and the
//!   `ClientHandle` the UI drives it through

pub mod message_batcher;
pub mod session_service;

pub use message_batcher::{FlushReport, MessageBatcher};
pub use session_service::{ClientError, ClientHandle, Intent, SessionService};
