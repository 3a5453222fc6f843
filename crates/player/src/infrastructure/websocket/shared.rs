//! Shared helpers for the WebSocket client.
//!
//! Runtime-agnostic (no tokio) so both the supervisor and tests can use them.

use rpggame_shared::ServerUpdate;
use url::Url;

use crate::ports::outbound::TransportError;

// Reconnection constants
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Close code for an intentional, clean shutdown
pub const NORMAL_CLOSE_CODE: u16 = 1000;
/// Close code used when the link ended without a close frame
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

const SESSION_PATH: &str = "/ws/game";

pub fn parse_server_update(text: &str) -> Result<ServerUpdate, serde_json::Error> {
    serde_json::from_str(text)
}

/// Build the session URL: `<base>/ws/game?token=<token>`.
///
/// `http(s)://` bases are mapped to `ws(s)://`.
pub fn session_url(base: &str, token: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(base).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(format!("cannot use scheme {scheme}")))?;

    url.set_path(SESSION_PATH);
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}
