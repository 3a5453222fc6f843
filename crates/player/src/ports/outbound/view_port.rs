//! View Port - the presentation layer's hook into each applied update
//!
//! The session loop calls the observer once per update, right after the
//! reconciler has merged it, so a renderer can react to exactly what changed.

use rpggame_shared::ServerUpdate;

use crate::state::Snapshot;

/// Failure while a view applies one update.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The view was mid-rebuild and could not take the update yet
    #[error("View not ready: {0}")]
    ViewNotReady(String),
    #[error("Failed to apply update: {0}")]
    Failed(String),
}

impl ApplyError {
    /// Transient races are expected and not worth reporting
    pub fn is_transient(&self) -> bool {
        matches!(self, ApplyError::ViewNotReady(_))
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait UpdateObserver: Send + Sync {
    fn on_update(&mut self, update: &ServerUpdate, snapshot: &Snapshot) -> Result<(), ApplyError>;
}
