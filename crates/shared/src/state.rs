//! Partial game state carried by server updates.
//!
//! The server is authoritative for game rules; the client only needs a handful
//! of typed fields. Everything else is preserved verbatim in `extra` maps so a
//! round trip through the client never loses data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Partial state object. Each field is independently present or absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<OpaqueView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<OpaqueView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dungeon: Option<OpaqueView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_players: Option<Vec<OnlinePlayer>>,
}

impl StateData {
    /// Logical screen identifier; the server sends `""` when it has none
    pub fn screen(&self) -> Option<&str> {
        self.screen.as_deref().filter(|s| !s.is_empty())
    }
}

/// A location as listed on the player's map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Classification ("Mix", "Ruin", "Resource", "Trade", "Base")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Level ceiling of the monsters found here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_max: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Visible player profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_locations: Option<Vec<LocationEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_locations: Option<Vec<LocationEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A status effect shown in the combat HUD
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectView {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: i32,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

/// A guard fighting alongside the player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardView {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub injured: bool,
}

/// Combat-specific rendering state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatView {
    #[serde(default, deserialize_with = "null_as_default")]
    pub turn: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_max_hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_mp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_max_mp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_sp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_max_sp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_effects: Vec<EffectView>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_level: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_max_hp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_mp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_max_mp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_sp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_max_sp: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monster_effects: Vec<EffectView>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub guards: Vec<GuardView>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entry in the online-player roster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlinePlayer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sub-state whose contents the client does not interpret (village, town, dungeon).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueView(pub Map<String, Value>);

impl OpaqueView {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// The server sends zero values (empty lists, unset numbers) as `null`
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_extras_are_preserved() {
        let player: PlayerState = serde_json::from_str(
            r#"{"name":"Ash","level":4,"hp":20,"max_hp":30,"known_locations":[{"name":"Forest","type":"Mix","level_max":5}]}"#,
        )
        .unwrap();

        assert_eq!(player.name, "Ash");
        assert_eq!(player.level, 4);
        assert_eq!(player.extra.get("hp"), Some(&Value::from(20)));

        let known = player.known_locations.unwrap();
        assert_eq!(known[0].kind.as_deref(), Some("Mix"));
        assert_eq!(known[0].level_max, Some(5));
    }

    #[test]
    fn test_terse_location_has_no_enrichment() {
        let entry: LocationEntry = serde_json::from_str(r#"{"name":"Lake"}"#).unwrap();
        assert_eq!(entry, LocationEntry::new("Lake"));
    }

    #[test]
    fn test_combat_null_slices() {
        let combat: CombatView = serde_json::from_str(
            r#"{"turn":2,"monster_name":"Goblin","player_effects":null,"monster_effects":null}"#,
        )
        .unwrap();
        assert_eq!(combat.turn, 2);
        assert!(combat.player_effects.is_empty());
        assert!(combat.guards.is_empty());
    }

    #[test]
    fn test_loose_nested_entries_still_parse() {
        let combat: CombatView = serde_json::from_str(
            r#"{"turn":null,"monster_level":null,"player_effects":[{"duration":2}],"guards":[{"hp":5,"name":null}]}"#,
        )
        .unwrap();
        assert_eq!(combat.turn, 0);
        assert_eq!(combat.player_effects[0].name, "");
        assert_eq!(combat.player_effects[0].duration, 2);
        assert_eq!(combat.guards[0].hp, 5);

        let player: PlayerState = serde_json::from_str(
            r#"{"name":"Ash","level":null,"known_locations":[{"type":"Ruin"}]}"#,
        )
        .unwrap();
        assert_eq!(player.level, 0);
        assert_eq!(player.known_locations.unwrap()[0].kind.as_deref(), Some("Ruin"));

        let roster: Vec<OnlinePlayer> = serde_json::from_str(r#"[{"level":3}]"#).unwrap();
        assert_eq!(roster[0].level, Some(3));
    }

    #[test]
    fn test_empty_screen_reads_as_absent() {
        let state: StateData = serde_json::from_str(r#"{"screen":""}"#).unwrap();
        assert_eq!(state.screen(), None);

        let state: StateData = serde_json::from_str(r#"{"screen":"main_menu"}"#).unwrap();
        assert_eq!(state.screen(), Some("main_menu"));
    }

    #[test]
    fn test_present_but_empty_is_not_absent() {
        let state: StateData = serde_json::from_str(r#"{"village":{}}"#).unwrap();
        assert_eq!(state.village, Some(OpaqueView::default()));
        assert!(state.town.is_none());
    }
}
