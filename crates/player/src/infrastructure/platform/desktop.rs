//! Desktop platform implementations

use std::env;

use chrono::{DateTime, Utc};

use crate::ports::outbound::{AuthProvider, ClockPort};

/// Environment variable holding the session bearer token
pub const TOKEN_ENV_VAR: &str = "GAME_TOKEN";

/// Desktop clock using the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Auth provider reading the bearer token from the environment.
///
/// The token is read on every call so an updated `.env` or exported variable
/// is picked up by the next `connect`.
#[derive(Debug, Clone)]
pub struct EnvAuthProvider {
    var: String,
}

impl Default for EnvAuthProvider {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

impl EnvAuthProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl AuthProvider for EnvAuthProvider {
    fn bearer_token(&self) -> Option<String> {
        env::var(&self.var)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// Auth provider holding a token supplied up front (e.g. on the command line)
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    token: Option<String>,
}

impl StaticAuthProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
