//! WebSocket message types for server-player communication
//!
//! The player sends [`ClientCommand`] frames and receives [`ServerUpdate`] frames.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Renaming variants is a breaking change
//! - Unknown enum variants deserialize to `Unknown` variant for forward compatibility

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state::{null_as_default, StateData};

fn default_true() -> bool {
    true
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

// =============================================================================
// Client Commands (Player → Server)
// =============================================================================

/// Whether a command value is a menu-option key or free-form text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// `value` is the key of one of the currently offered options
    Select,
    /// `value` is free text answering the active prompt
    Input,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Select => "select",
            CommandKind::Input => "input",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown command type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command type: {0}")]
pub struct UnknownCommandKindError(pub String);

impl FromStr for CommandKind {
    type Err = UnknownCommandKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(CommandKind::Select),
            "input" => Ok(CommandKind::Input),
            other => Err(UnknownCommandKindError(other.to_string())),
        }
    }
}

/// Outbound command frame: `{ "type": "select" | "input", "value": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCommand {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub value: String,
}

impl ClientCommand {
    pub fn new(kind: CommandKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Choose a menu option by key
    pub fn select(value: impl Into<String>) -> Self {
        Self::new(CommandKind::Select, value)
    }

    /// Answer the active prompt
    pub fn input(value: impl Into<String>) -> Self {
        Self::new(CommandKind::Input, value)
    }
}

// =============================================================================
// Server Updates (Server → Player)
// =============================================================================

/// The `type` tag of an inbound update frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Menu,
    Combat,
    Narrative,
    Error,
    /// Session is over; the client should disconnect
    Exit,
    /// Lightweight push (periodic harvest tick); must not clear the open menu
    Harvest,
    /// Online roster refresh
    Presence,
    /// Unknown frame type for forward compatibility
    #[serde(other)]
    Unknown,
}

/// Category metadata attached to each narrative message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    #[default]
    System,
    Combat,
    Damage,
    Heal,
    Loot,
    Buff,
    Debuff,
    Narrative,
    Error,
    #[serde(rename = "levelup")]
    LevelUp,
    /// Unknown variant for forward compatibility
    #[serde(other)]
    Unknown,
}

/// A single display message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: MessageCategory,
}

impl GameMessage {
    pub fn new(text: impl Into<String>, category: MessageCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }

    /// Blank messages carry no narrative and are never displayed
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A selectable action offered by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub enabled: bool,
}

impl MenuOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            enabled: true,
        }
    }
}

/// Inbound update frame.
///
/// Every top-level field is optional; absence means "no change to that facet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<UpdateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<MenuOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<GameMessage>>,
}

impl ServerUpdate {
    /// Push updates refresh state without replacing the displayed menu
    pub fn is_push(&self) -> bool {
        self.kind == Some(UpdateKind::Harvest)
    }

    /// Presence frames only refresh the online roster
    pub fn is_presence(&self) -> bool {
        self.kind == Some(UpdateKind::Presence)
    }

    /// The server is ending the session
    pub fn is_terminal(&self) -> bool {
        self.kind == Some(UpdateKind::Exit)
    }

    pub fn messages(&self) -> &[GameMessage] {
        self.messages.as_deref().unwrap_or_default()
    }

    /// Active prompt text; an empty string means no prompt
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }
}
