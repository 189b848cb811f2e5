//! Component records attached to characters.

use serde::{Deserialize, Serialize};

/// Ability scores plus the hit point and stamina pools.
///
/// Only the pools carry an enforced bound (never below zero); ability
/// scores are free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
    pub current_hp: i32,
    pub max_hp: i32,
    pub current_stamina: i32,
    pub max_stamina: i32,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub aim: i32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
            current_hp: 100,
            max_hp: 100,
            current_stamina: 100,
            max_stamina: 100,
            attack: 0,
            defense: 0,
            aim: 0,
        }
    }
}

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl StatType {
    pub const ALL: [StatType; 6] = [
        StatType::Strength,
        StatType::Dexterity,
        StatType::Constitution,
        StatType::Intelligence,
        StatType::Wisdom,
        StatType::Charisma,
    ];

    /// Three-letter label used in narrative context.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            StatType::Strength => "STR",
            StatType::Dexterity => "DEX",
            StatType::Constitution => "CON",
            StatType::Intelligence => "INT",
            StatType::Wisdom => "WIS",
            StatType::Charisma => "CHA",
        }
    }
}

impl CombatStats {
    /// Raw score for an ability.
    pub fn score(&self, stat: StatType) -> i32 {
        match stat {
            StatType::Strength => self.strength,
            StatType::Dexterity => self.dexterity,
            StatType::Constitution => self.constitution,
            StatType::Intelligence => self.intelligence,
            StatType::Wisdom => self.wisdom,
            StatType::Charisma => self.charisma,
        }
    }

    /// D20-style modifier: `(score - 10) / 2`, rounded toward negative infinity.
    pub fn modifier(&self, stat: StatType) -> i32 {
        (self.score(stat) - 10).div_euclid(2)
    }

    /// Apply damage to the hit point pool, flooring at zero.
    ///
    /// Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount.max(0)).max(0);
        before - self.current_hp
    }
}

/// Names of the bounded survival meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalStat {
    Hunger,
    Thirst,
    InfectionRisk,
}

impl SurvivalStat {
    pub fn name(&self) -> &'static str {
        match self {
            SurvivalStat::Hunger => "hunger",
            SurvivalStat::Thirst => "thirst",
            SurvivalStat::InfectionRisk => "infection_risk",
        }
    }
}

impl std::fmt::Display for SurvivalStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Survival meters, each conceptually within `[0, 100]`.
///
/// `hunger` and `thirst` count deprivation upward: 0 is fully fed or
/// hydrated. Writes should go through the survival tracker so the bounds
/// hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurvivalStats {
    pub hunger: i32,
    pub thirst: i32,
    pub infection_risk: i32,
}

impl SurvivalStats {
    pub fn get(&self, stat: SurvivalStat) -> i32 {
        match stat {
            SurvivalStat::Hunger => self.hunger,
            SurvivalStat::Thirst => self.thirst,
            SurvivalStat::InfectionRisk => self.infection_risk,
        }
    }

    pub fn get_mut(&mut self, stat: SurvivalStat) -> &mut i32 {
        match stat {
            SurvivalStat::Hunger => &mut self.hunger,
            SurvivalStat::Thirst => &mut self.thirst,
            SurvivalStat::InfectionRisk => &mut self.infection_risk,
        }
    }
}

/// One inventory slot: either a bare item name or a tracked item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryEntry {
    Named(String),
    Item {
        name: String,
        #[serde(default)]
        durability: Option<u32>,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
}

fn default_quantity() -> u32 {
    1
}

impl InventoryEntry {
    pub fn name(&self) -> &str {
        match self {
            InventoryEntry::Named(name) => name,
            InventoryEntry::Item { name, .. } => name,
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            InventoryEntry::Named(_) => 1,
            InventoryEntry::Item { quantity, .. } => *quantity,
        }
    }
}

impl From<&str> for InventoryEntry {
    fn from(name: &str) -> Self {
        InventoryEntry::Named(name.to_string())
    }
}
