//! Two-step command chains (navigate, then act).
//!
//! A UI intent that needs an intermediate screen registers a pending action.
//! After every reconcile pass the chain checks whether that screen is showing
//! and, if so, hands back the command to issue.

use rpggame_shared::ClientCommand;

use super::snapshot::ActiveInput;

/// A deferred `select` waiting for the server to reach `expected_screen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub value: String,
    pub expected_screen: Option<String>,
}

impl PendingAction {
    pub fn new(value: impl Into<String>, expected_screen: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expected_screen: Some(expected_screen.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Nothing pending
    Idle,
    /// Still waiting for the expected screen
    Waiting,
    /// Expected screen reached and the value is on offer
    Fire(ClientCommand),
    /// The pending action was dropped without firing
    Discarded(PendingAction),
}

#[derive(Debug, Clone, Default)]
pub struct ActionChain {
    pending: Option<PendingAction>,
}

impl ActionChain {
    /// Register `action`, replacing whatever was pending.
    pub fn set(&mut self, action: PendingAction) -> Option<PendingAction> {
        self.pending.replace(action)
    }

    pub fn clear(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn evaluate(&mut self, screen: &str, input: &ActiveInput) -> ChainOutcome {
        let Some(pending) = &self.pending else {
            return ChainOutcome::Idle;
        };

        match pending.expected_screen.as_deref() {
            None => {}
            Some(expected) if expected == screen => {}
            Some(_) => return ChainOutcome::Waiting,
        }

        let Some(action) = self.pending.take() else {
            return ChainOutcome::Idle;
        };
        if action.expected_screen.is_some() && input.has_option(&action.value) {
            ChainOutcome::Fire(ClientCommand::select(action.value))
        } else {
            ChainOutcome::Discarded(action)
        }
    }
}
