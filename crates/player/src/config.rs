//! Client configuration

use std::env;
use std::time::Duration;

use rpggame_shared::ClientCommand;

use crate::infrastructure::websocket::{
    ConnectionSettings, DEFAULT_RECONNECT_DELAY_MS, MAX_RETRY_ATTEMPTS,
};

const DEFAULT_SERVER_URL: &str = "ws://localhost:8080";
const DEFAULT_AUTO_HUNT_DELAY_MS: u64 = 1_000;
const PENDING_ACTION_DELAY_MS: u64 = 50;
const FRESHNESS_MS: u64 = 2_000;
const SESSION_END_GRACE_MS: u64 = 1_500;
/// Option key the server uses for "continue fighting"
const AUTO_HUNT_OPTION: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Delays applied by the session loop to reconciler effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimings {
    /// Wait before re-issuing the continue command while auto-hunting
    pub auto_hunt_delay: Duration,
    /// Settle time before a pending action's command is sent
    pub pending_action_delay: Duration,
    /// How long a new message group stays highlighted
    pub freshness: Duration,
    /// Grace period between the server's exit signal and the disconnect
    pub session_end_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            auto_hunt_delay: Duration::from_millis(DEFAULT_AUTO_HUNT_DELAY_MS),
            pending_action_delay: Duration::from_millis(PENDING_ACTION_DELAY_MS),
            freshness: Duration::from_millis(FRESHNESS_MS),
            session_end_delay: Duration::from_millis(SESSION_END_GRACE_MS),
        }
    }
}

/// Client configuration loaded from environment
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Game server base URL (`ws(s)://` or `http(s)://`)
    pub server_url: String,
    /// Reconnect delay unit; retry `n` waits `n` times this
    pub reconnect_base_delay: Duration,
    /// Reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    pub timings: SessionTimings,
    /// Command re-issued by auto-hunt
    pub auto_hunt_command: ClientCommand,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_base_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: MAX_RETRY_ATTEMPTS,
            timings: SessionTimings::default(),
            auto_hunt_command: ClientCommand::select(AUTO_HUNT_OPTION),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_url = lookup("GAME_SERVER_URL")
            .or_else(|| lookup("RPG_SERVER_URL"))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.server_url);

        let reconnect_base_delay = millis(&lookup, "RPG_RECONNECT_BASE_MS")?
            .unwrap_or(defaults.reconnect_base_delay);

        let max_reconnect_attempts = match lookup("RPG_MAX_RECONNECTS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "RPG_MAX_RECONNECTS",
                    value,
                })?,
            None => defaults.max_reconnect_attempts,
        };

        let timings = SessionTimings {
            auto_hunt_delay: millis(&lookup, "RPG_AUTO_HUNT_DELAY_MS")?
                .unwrap_or(defaults.timings.auto_hunt_delay),
            ..defaults.timings
        };

        Ok(Self {
            server_url,
            reconnect_base_delay,
            max_reconnect_attempts,
            timings,
            auto_hunt_command: defaults.auto_hunt_command,
        })
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            server_url: self.server_url.clone(),
            base_delay: self.reconnect_base_delay,
            max_attempts: self.max_reconnect_attempts,
        }
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}
