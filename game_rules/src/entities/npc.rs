//! Non-player characters as seen by the narrative layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bounds of [`NpcMemory::trust`].
pub const TRUST_MIN: i32 = -100;
pub const TRUST_MAX: i32 = 100;

/// An NPC present in a scene. Read-only input to context assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    #[serde(default = "default_race")]
    pub race: String,
    #[serde(default = "default_unknown")]
    pub profession: String,
    #[serde(default = "default_personality")]
    pub personality: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Topics this NPC can speak to with authority.
    #[serde(default)]
    pub knowledge: Vec<String>,
    #[serde(default)]
    pub quests: Vec<String>,
    #[serde(default = "default_mood")]
    pub mood: String,
    /// Attitude toward the player, from -100 (hostile) to 100 (devoted).
    #[serde(default)]
    pub disposition: i32,
}

fn default_race() -> String {
    "Human".to_string()
}

fn default_unknown() -> String {
    "Unknown".to_string()
}

fn default_personality() -> String {
    "Neutral".to_string()
}

fn default_mood() -> String {
    "wary".to_string()
}

fn default_level() -> u32 {
    1
}

impl Npc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            race: default_race(),
            profession: default_unknown(),
            personality: default_personality(),
            level: default_level(),
            knowledge: Vec::new(),
            quests: Vec::new(),
            mood: default_mood(),
            disposition: 0,
        }
    }

    pub fn with_profession(mut self, profession: impl Into<String>) -> Self {
        self.profession = profession.into();
        self
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn with_knowledge(mut self, topic: impl Into<String>) -> Self {
        self.knowledge.push(topic.into());
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }

    pub fn with_disposition(mut self, disposition: i32) -> Self {
        self.disposition = disposition.clamp(-100, 100);
        self
    }

    /// True if lower-cased `text` names this NPC, either by name or by a
    /// known profession ("ask the medic").
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        let named = !self.name.is_empty() && text.contains(&self.name.to_lowercase());
        let by_trade = !self.profession.is_empty()
            && self.profession != default_unknown()
            && text.contains(&self.profession.to_lowercase());
        named || by_trade
    }

    /// Coarse label for the NPC's attitude toward the player.
    pub fn attitude(&self) -> &'static str {
        match self.disposition {
            i32::MIN..=-50 => "hostile",
            -49..=-1 => "distrustful",
            0..=49 => "neutral",
            _ => "friendly",
        }
    }
}

/// What one NPC has already discussed with the player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcMemory {
    pub topics: BTreeSet<String>,
    /// Information the NPC has already handed over.
    pub shared_info: BTreeSet<String>,
    /// The NPC's trust in the player, within [`TRUST_MIN`, `TRUST_MAX`].
    pub trust: i32,
}

impl NpcMemory {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.shared_info.is_empty() && self.trust == 0
    }

    /// Shift trust by `delta`, clamped. Returns the new level.
    pub fn adjust_trust(&mut self, delta: i32) -> i32 {
        self.trust = self.trust.saturating_add(delta).clamp(TRUST_MIN, TRUST_MAX);
        self.trust
    }

    /// Merge one conversation turn. Blank entries are skipped.
    pub fn record(
        &mut self,
        topics: impl IntoIterator<Item = String>,
        shared_info: impl IntoIterator<Item = String>,
        trust_change: i32,
    ) {
        let keep = |entry: &String| !entry.trim().is_empty();
        self.topics.extend(topics.into_iter().filter(keep));
        self.shared_info.extend(shared_info.into_iter().filter(keep));
        self.adjust_trust(trust_change);
    }
}
