//! The client-side mirror of server-authoritative game state.

use rpggame_shared::{CombatView, MenuOption, OnlinePlayer, OpaqueView, PlayerState};

use super::message_log::{CombatLog, MessageHistory};
use super::router::Section;

/// Screen on which auto-hunt may re-issue the continue command
pub const COMBAT_SCREEN: &str = "combat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No game session; the player picks a character
    #[default]
    CharacterSelect,
    InGame,
}

/// What the server is currently asking for. A prompt and an option list are
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveInput {
    #[default]
    None,
    Options(Vec<MenuOption>),
    Prompt(String),
}

impl ActiveInput {
    /// Build from an update's facets. A non-empty prompt wins over options.
    pub fn from_parts(options: Option<&[MenuOption]>, prompt: Option<&str>) -> Self {
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            return ActiveInput::Prompt(prompt.to_string());
        }
        match options {
            Some(options) if !options.is_empty() => ActiveInput::Options(options.to_vec()),
            _ => ActiveInput::None,
        }
    }

    pub fn options(&self) -> &[MenuOption] {
        match self {
            ActiveInput::Options(options) => options,
            _ => &[],
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            ActiveInput::Prompt(prompt) => Some(prompt),
            _ => None,
        }
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options().iter().any(|o| o.key == key)
    }
}

/// Combat sub-menu opened from the action bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMenu {
    Items,
    Skills,
}

/// Where narrative messages from the next update will land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeTarget {
    CombatLog,
    Ambient,
}

/// Canonical local snapshot. Written only by the reconciler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub phase: SessionPhase,
    pub player: Option<PlayerState>,
    pub combat: Option<CombatView>,
    pub village: Option<OpaqueView>,
    pub town: Option<OpaqueView>,
    pub dungeon: Option<OpaqueView>,
    /// Logical screen identifier last reported by the server
    pub screen: Option<String>,
    pub input: ActiveInput,
    pub online_players: Vec<OnlinePlayer>,
    pub combat_log: CombatLog,
    pub history: MessageHistory,
    pub action_menu: Option<ActionMenu>,
    pub auto_hunt: bool,
    pub active_section: Section,
}

impl Snapshot {
    pub fn in_combat(&self) -> bool {
        self.combat.is_some()
    }

    pub fn narrative_target(&self) -> NarrativeTarget {
        if self.in_combat() {
            NarrativeTarget::CombatLog
        } else {
            NarrativeTarget::Ambient
        }
    }

    pub fn screen(&self) -> Option<&str> {
        self.screen.as_deref()
    }

    /// Combat is active and the server is waiting on the plain combat screen
    pub fn on_combat_screen(&self) -> bool {
        self.in_combat() && self.screen() == Some(COMBAT_SCREEN)
    }

    /// Return every session-scoped field to its initial value. The ambient
    /// history and the online roster outlive the session.
    pub fn reset_session(&mut self) {
        *self = Snapshot {
            history: std::mem::take(&mut self.history),
            online_players: std::mem::take(&mut self.online_players),
            ..Snapshot::default()
        };
    }
}
