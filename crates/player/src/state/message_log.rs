//! Narrative message storage: the combat log and the ambient history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rpggame_shared::{GameMessage, MessageCategory};

/// Combat log length that triggers a trim
pub const COMBAT_LOG_TRIM_AT: usize = 100;
/// Entries kept after a trim
pub const COMBAT_LOG_KEEP: usize = 80;
/// Message groups kept in the ambient history
pub const HISTORY_CAPACITY: usize = 15;

/// Most interesting category first
const CATEGORY_PRIORITY: [MessageCategory; 11] = [
    MessageCategory::LevelUp,
    MessageCategory::Loot,
    MessageCategory::Damage,
    MessageCategory::Heal,
    MessageCategory::Buff,
    MessageCategory::Debuff,
    MessageCategory::Combat,
    MessageCategory::Error,
    MessageCategory::Narrative,
    MessageCategory::System,
    MessageCategory::Unknown,
];

/// Category used to headline a group of messages.
pub fn headline_category(messages: &[GameMessage]) -> MessageCategory {
    CATEGORY_PRIORITY
        .iter()
        .copied()
        .find(|category| messages.iter().any(|m| m.category == *category))
        .unwrap_or_default()
}

/// Messages received while combat is active
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatLog {
    entries: Vec<GameMessage>,
}

impl CombatLog {
    pub fn extend(&mut self, messages: impl IntoIterator<Item = GameMessage>) {
        self.entries.extend(messages);
        if self.entries.len() > COMBAT_LOG_TRIM_AT {
            let excess = self.entries.len() - COMBAT_LOG_KEEP;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[GameMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Messages that arrived together in one update outside combat
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup {
    pub id: u64,
    pub arrived_at: DateTime<Utc>,
    pub messages: Vec<GameMessage>,
    pub headline: MessageCategory,
    pub collapsed: bool,
    /// Set on arrival, cleared shortly after for transient highlighting
    pub fresh: bool,
}

/// Bounded ambient message history, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHistory {
    groups: VecDeque<MessageGroup>,
    next_id: u64,
}

impl MessageHistory {
    /// Append a group and return its id. Evicts the oldest groups past capacity.
    pub fn push(&mut self, arrived_at: DateTime<Utc>, messages: Vec<GameMessage>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let headline = headline_category(&messages);

        self.groups.push_back(MessageGroup {
            id,
            arrived_at,
            messages,
            headline,
            collapsed: true,
            fresh: true,
        });
        while self.groups.len() > HISTORY_CAPACITY {
            self.groups.pop_front();
        }
        id
    }

    /// Clear the fresh flag of group `id`. Returns whether anything changed.
    pub fn expire_freshness(&mut self, id: u64) -> bool {
        match self.get_mut(id) {
            Some(group) if group.fresh => {
                group.fresh = false;
                true
            }
            _ => false,
        }
    }

    /// Flip the collapsed flag of group `id`. Returns whether the group exists.
    pub fn toggle(&mut self, id: u64) -> bool {
        match self.get_mut(id) {
            Some(group) => {
                group.collapsed = !group.collapsed;
                true
            }
            None => false,
        }
    }

    pub fn groups(&self) -> impl DoubleEndedIterator<Item = &MessageGroup> + ExactSizeIterator {
        self.groups.iter()
    }

    pub fn latest(&self) -> Option<&MessageGroup> {
        self.groups.back()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut MessageGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str, category: MessageCategory) -> GameMessage {
        GameMessage::new(text, category)
    }

    #[test]
    fn test_combat_log_trims_to_last_80() {
        let mut log = CombatLog::default();
        log.extend((0..100).map(|i| msg(&format!("hit {i}"), MessageCategory::Combat)));
        assert_eq!(log.len(), 100);

        log.extend([msg("hit 100", MessageCategory::Combat)]);

        assert_eq!(log.len(), 80);
        assert_eq!(log.entries()[0].text, "hit 21");
        assert_eq!(log.entries()[79].text, "hit 100");
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = MessageHistory::default();
        let now = Utc::now();
        for i in 0..20 {
            history.push(now, vec![msg(&format!("m{i}"), MessageCategory::System)]);
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        let first = history.groups().next().unwrap();
        assert_eq!(first.messages[0].text, "m5");
        assert_eq!(history.latest().unwrap().id, 20);
    }

    #[test]
    fn test_new_group_is_collapsed_and_fresh() {
        let mut history = MessageHistory::default();
        let id = history.push(Utc::now(), vec![msg("hello", MessageCategory::Narrative)]);

        let group = history.latest().unwrap();
        assert!(group.collapsed);
        assert!(group.fresh);

        assert!(history.expire_freshness(id));
        assert!(!history.expire_freshness(id));
        assert!(!history.latest().unwrap().fresh);

        assert!(history.toggle(id));
        assert!(!history.latest().unwrap().collapsed);
        assert!(!history.toggle(999));
    }

    #[test]
    fn test_headline_prefers_highest_priority() {
        let messages = vec![
            msg("You walk", MessageCategory::Narrative),
            msg("Found 3 gold", MessageCategory::Loot),
            msg("Took 2 damage", MessageCategory::Damage),
        ];
        assert_eq!(headline_category(&messages), MessageCategory::Loot);

        let messages = vec![
            msg("LEVEL UP!", MessageCategory::LevelUp),
            msg("Found 3 gold", MessageCategory::Loot),
        ];
        assert_eq!(headline_category(&messages), MessageCategory::LevelUp);

        assert_eq!(headline_category(&[]), MessageCategory::System);
    }
}
