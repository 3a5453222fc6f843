//! Auth Port - supplies the bearer token used to open a game session
//!
//! Login/logout flows live outside this crate; the client only ever asks for
//! the current token when it is told to connect.

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Current bearer token, or `None` when logged out
    fn bearer_token(&self) -> Option<String>;
}
