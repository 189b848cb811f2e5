//! Player character definition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{CombatStats, EntityId, InventoryEntry, SurvivalStat, SurvivalStats};

/// A player character with all the state one action can touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    pub level: u32,
    /// Tag of the user or session that owns this character.
    pub owner: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
    /// Slot name -> item name.
    #[serde(default)]
    pub equipment: HashMap<String, String>,
    #[serde(default)]
    pub quests: Vec<String>,

    #[serde(default)]
    pub stats: CombatStats,
    /// `None` for records created before survival mechanics existed.
    #[serde(default)]
    pub survival_stats: Option<SurvivalStats>,
}

impl Character {
    /// Create a level 1 character with fresh stats and survival meters.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            level: 1,
            owner: owner.into(),
            attributes: HashMap::new(),
            inventory: Vec::new(),
            equipment: HashMap::new(),
            quests: Vec::new(),
            stats: CombatStats::default(),
            survival_stats: Some(SurvivalStats::default()),
        }
    }

    /// Check if the character is alive.
    pub fn is_alive(&self) -> bool {
        self.stats.current_hp > 0
    }

    /// Current value of a survival meter, or `None` if the character has no
    /// survival block.
    pub fn survival_stat(&self, stat: SurvivalStat) -> Option<i32> {
        self.survival_stats.as_ref().map(|s| s.get(stat))
    }

    /// Mutable access to a survival meter, if the block exists.
    pub fn survival_stat_mut(&mut self, stat: SurvivalStat) -> Option<&mut i32> {
        self.survival_stats.as_mut().map(|s| s.get_mut(stat))
    }

    /// Names of inventory items in carried order.
    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.inventory.iter().map(InventoryEntry::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character() {
        let character = Character::new("Test Survivor", "player-1");
        assert_eq!(character.name, "Test Survivor");
        assert_eq!(character.level, 1);
        assert!(character.is_alive());
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(0));
    }

    #[test]
    fn test_character_death() {
        let mut character = Character::new("Doomed", "player-1");
        character.stats.current_hp = 0;
        assert!(!character.is_alive());
    }

    #[test]
    fn test_missing_survival_block_is_absent() {
        let mut character = Character::new("Legacy", "player-1");
        character.survival_stats = None;

        assert_eq!(character.survival_stat(SurvivalStat::Thirst), None);
        assert!(character.survival_stat_mut(SurvivalStat::Thirst).is_none());
    }

    #[test]
    fn test_legacy_record_deserializes_without_survival_stats() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "name": "Old Save",
            "level": 3,
            "owner": "player-9",
            "inventory": ["Rope"]
        }"#;
        let character: Character = serde_json::from_str(json).unwrap();

        assert_eq!(character.id, EntityId::nil());
        assert!(character.survival_stats.is_none());
        assert_eq!(character.stats.max_hp, 100);
        assert_eq!(character.item_names().collect::<Vec<_>>(), vec!["Rope"]);
    }
}
