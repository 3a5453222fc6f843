//! Screen routing: server screen identifier -> active UI section.
//!
//! The table is consulted top to bottom and the first matching row wins.
//! Identifiers that match no row leave the section where it is, so screens
//! added server-side never yank the player to an unrelated view.

use std::fmt;

/// Top-level UI section the player is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    Hub,
    Map,
    Village,
    Town,
    Dungeon,
    Quests,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Hub => "hub",
            Section::Map => "map",
            Section::Village => "village",
            Section::Town => "town",
            Section::Dungeon => "dungeon",
            Section::Quests => "quests",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum ScreenMatch {
    Exact(&'static str),
    Prefix(&'static str),
    OneOf(&'static [&'static str]),
}

impl ScreenMatch {
    fn matches(&self, screen: &str) -> bool {
        match self {
            ScreenMatch::Exact(name) => screen == *name,
            ScreenMatch::Prefix(prefix) => screen.starts_with(prefix),
            ScreenMatch::OneOf(names) => names.contains(&screen),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Combat is shown from combat state, not from a section
    Stay,
    Show(Section),
}

const ROUTES: &[(ScreenMatch, Route)] = &[
    (ScreenMatch::Exact("combat"), Route::Stay),
    (ScreenMatch::Prefix("combat_"), Route::Stay),
    (ScreenMatch::Prefix("bounty"), Route::Show(Section::Hub)),
    (ScreenMatch::Prefix("hunt_"), Route::Show(Section::Map)),
    (ScreenMatch::Prefix("village_"), Route::Show(Section::Village)),
    (ScreenMatch::Prefix("town_"), Route::Show(Section::Town)),
    (ScreenMatch::Exact("dungeon"), Route::Show(Section::Dungeon)),
    (ScreenMatch::Prefix("dungeon_"), Route::Show(Section::Dungeon)),
    (ScreenMatch::Exact("quest_log"), Route::Show(Section::Quests)),
    (ScreenMatch::Prefix("autoplay_"), Route::Show(Section::Hub)),
    (
        ScreenMatch::OneOf(&[
            "main_menu",
            "harvest_select",
            "player_stats",
            "discovered_locations",
        ]),
        Route::Show(Section::Hub),
    ),
];

/// Section to show after the server reports `screen`.
pub fn next_section(current: Section, screen: Option<&str>) -> Section {
    let Some(screen) = screen else {
        return current;
    };

    match ROUTES.iter().find(|(pattern, _)| pattern.matches(screen)) {
        Some((_, Route::Show(section))) => *section,
        Some((_, Route::Stay)) | None => current,
    }
}
