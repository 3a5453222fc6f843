//! Platform-specific implementations
//!
//! Desktop implementations of the platform ports defined in
//! `ports/outbound`.

mod desktop;

pub use desktop::{EnvAuthProvider, StaticAuthProvider, SystemClock, TOKEN_ENV_VAR};
