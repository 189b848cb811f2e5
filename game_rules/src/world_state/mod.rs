//! Per-session game state: scene, NPCs, history, combat, and memory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{Npc, NpcMemory};
use crate::mechanics::CombatLedger;

/// History is trimmed to this many entries on every append.
pub const MAX_MESSAGES: usize = 20;

/// Author of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Snapshot of the enemy in the current encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
}

impl EnemySnapshot {
    pub fn new(name: impl Into<String>, max_health: i32) -> Self {
        Self {
            name: name.into(),
            health: max_health,
            max_health,
        }
    }
}

/// Combat sub-record of the game state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatState {
    pub active: bool,
    pub enemy: Option<EnemySnapshot>,
    /// Narrative lines of the encounter so far.
    #[serde(default)]
    pub log: Vec<String>,
    /// Lives only as long as the encounter; never persisted.
    #[serde(skip)]
    pub ledger: CombatLedger,
}

/// The complete state of one play session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub location_id: String,
    pub current_location: String,
    /// Where the player was before the last resolved move.
    pub previous_location: Option<String>,
    pub scene_description: String,
    pub npcs_present: Vec<Npc>,
    pub events: Vec<String>,
    pub messages: Vec<Message>,
    pub combat: Option<CombatState>,
    /// Long-term facts, merged from backend replies.
    pub long_term_memory: BTreeMap<String, serde_json::Value>,
    /// Running narrative summary of the session.
    pub summary: String,
    /// Labels the player can target in the current scene.
    pub interactable_elements: Vec<String>,
    /// Conversation memory per NPC name.
    pub npc_memory: BTreeMap<String, NpcMemory>,
}

impl GameState {
    /// Create a new empty game state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state positioned at a starting location.
    pub fn at_location(
        location_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            current_location: name.into(),
            scene_description: description.into(),
            ..Self::default()
        }
    }

    /// Append to the history, keeping only the last [`MAX_MESSAGES`] entries.
    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
        if self.messages.len() > MAX_MESSAGES {
            let excess = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..excess);
        }
    }

    /// The last `n` history entries, oldest first.
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Record a resolved move. The previous location name is kept for the
    /// arrival narration; interactables of the old scene are dropped.
    pub fn move_to(&mut self, location_id: impl Into<String>, name: impl Into<String>) {
        let previous = std::mem::replace(&mut self.current_location, name.into());
        if !previous.is_empty() {
            self.previous_location = Some(previous);
        }
        self.location_id = location_id.into();
        self.interactable_elements.clear();
    }

    /// Merge facts into long-term memory. Returns how many keys were new or
    /// changed.
    pub fn merge_facts(
        &mut self,
        facts: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> usize {
        let mut changed = 0;
        for (key, value) in facts {
            if self.long_term_memory.get(&key) != Some(&value) {
                self.long_term_memory.insert(key, value);
                changed += 1;
            }
        }
        changed
    }

    /// The encounter, if one is active.
    pub fn active_combat(&self) -> Option<&CombatState> {
        self.combat.as_ref().filter(|c| c.active)
    }

    pub fn active_combat_mut(&mut self) -> Option<&mut CombatState> {
        self.combat.as_mut().filter(|c| c.active)
    }

    pub fn is_in_combat(&self) -> bool {
        self.active_combat().is_some()
    }

    /// Begin an encounter against `enemy` with a fresh ledger.
    pub fn start_combat(&mut self, enemy: EnemySnapshot) {
        self.combat = Some(CombatState {
            active: true,
            enemy: Some(enemy),
            log: Vec::new(),
            ledger: CombatLedger::new(),
        });
    }

    /// End the encounter, handing back its ledger for a final summary.
    pub fn end_combat(&mut self) -> Option<CombatLedger> {
        self.combat.take().map(|c| c.ledger)
    }

    /// Look up a present NPC by name, ignoring case.
    pub fn find_npc(&self, name: &str) -> Option<&Npc> {
        self.npcs_present
            .iter()
            .find(|npc| npc.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Conversation memory of `name`, if they have talked with the player.
    pub fn npc_memory(&self, name: &str) -> Option<&NpcMemory> {
        self.npc_memory.get(name)
    }

    /// Conversation memory of `name`, created empty on first use.
    pub fn npc_memory_mut(&mut self, name: &str) -> &mut NpcMemory {
        self.npc_memory.entry(name.to_string()).or_default()
    }

    /// Present NPCs named in `text` by name or profession, ignoring case.
    pub fn npcs_mentioned_in<'a>(&'a self, text: &str) -> Vec<&'a Npc> {
        let lowered = text.to_lowercase();
        self.npcs_present
            .iter()
            .filter(|npc| npc.is_mentioned_in(&lowered))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanics::{ActorRole, CombatAction};

    #[test]
    fn test_history_is_capped() {
        let mut state = GameState::new();
        for i in 0..25 {
            state.add_message(MessageRole::User, format!("turn {i}"));
        }

        assert_eq!(state.messages.len(), MAX_MESSAGES);
        assert_eq!(state.messages[0].content, "turn 5");
        assert_eq!(state.recent_messages(3).len(), 3);
        assert_eq!(state.recent_messages(3)[0].content, "turn 22");
        assert_eq!(state.recent_messages(100).len(), MAX_MESSAGES);
    }

    #[test]
    fn test_move_to_tracks_previous_location() {
        let mut state = GameState::at_location("shelter", "Underground Shelter", "Damp walls.");
        state.interactable_elements.push("Generator".to_string());

        state.move_to("corridor", "Outer Corridor");

        assert_eq!(state.current_location, "Outer Corridor");
        assert_eq!(state.location_id, "corridor");
        assert_eq!(state.previous_location.as_deref(), Some("Underground Shelter"));
        assert!(state.interactable_elements.is_empty());
    }

    #[test]
    fn test_merge_facts_counts_changes() {
        let mut state = GameState::new();
        let first = state.merge_facts([
            ("generator_fuel".to_string(), serde_json::json!("low")),
            ("medic_trusts_player".to_string(), serde_json::json!(true)),
        ]);
        assert_eq!(first, 2);

        let second = state.merge_facts([
            ("generator_fuel".to_string(), serde_json::json!("low")),
            ("medic_trusts_player".to_string(), serde_json::json!(false)),
        ]);
        assert_eq!(second, 1);
        assert_eq!(state.long_term_memory["medic_trusts_player"], serde_json::json!(false));
    }

    #[test]
    fn test_combat_lifecycle() {
        let mut state = GameState::new();
        assert!(!state.is_in_combat());

        state.start_combat(EnemySnapshot::new("Walker", 30));
        assert!(state.is_in_combat());

        if let Some(combat) = state.active_combat_mut() {
            combat.ledger.add_action(
                CombatAction::new(ActorRole::Player, "Rosa", "Walker", "attack").with_damage(6),
            );
        }

        let ledger = state.end_combat().unwrap();
        assert_eq!(ledger.get_actor_statistics("Rosa").damage_dealt, 6);
        assert!(!state.is_in_combat());
    }

    #[test]
    fn test_ledger_is_not_serialized() {
        let mut state = GameState::new();
        state.start_combat(EnemySnapshot::new("Walker", 30));
        if let Some(combat) = state.active_combat_mut() {
            combat.ledger.start_new_round();
        }

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("ledger"));

        let restored: GameState = serde_json::from_str(&json).unwrap();
        assert!(restored.is_in_combat());
        assert!(restored.active_combat().unwrap().ledger.is_empty());
    }

    #[test]
    fn test_inactive_combat_record_is_ignored() {
        let mut state = GameState::new();
        state.combat = Some(CombatState {
            active: false,
            enemy: Some(EnemySnapshot::new("Walker", 30)),
            ..Default::default()
        });
        assert!(state.active_combat().is_none());
    }

    #[test]
    fn test_npc_lookup() {
        let mut state = GameState::new();
        state.npcs_present.push(Npc::new("Field Medic"));
        state.npcs_present.push(Npc::new("Old Survivor"));

        assert!(state.find_npc("field medic").is_some());
        assert!(state.find_npc("Trader").is_none());

        let mentioned = state.npcs_mentioned_in("Ask the old survivor about the gate");
        assert_eq!(mentioned.len(), 1);
        assert_eq!(mentioned[0].name, "Old Survivor");
    }

    #[test]
    fn test_npc_memory_created_on_first_use() {
        let mut state = GameState::new();
        assert!(state.npc_memory("Field Medic").is_none());

        state.npc_memory_mut("Field Medic").adjust_trust(10);
        state.npc_memory_mut("Field Medic").adjust_trust(5);
        assert_eq!(state.npc_memory("Field Medic").map(|m| m.trust), Some(15));
    }

    #[test]
    fn test_npcs_mentioned_by_profession() {
        let mut state = GameState::default();
        state
            .npcs_present
            .push(Npc::new("Field Medic").with_profession("doctor"));
        state.npcs_present.push(Npc::new("Dana"));

        let mentioned = state.npcs_mentioned_in("ask the DOCTOR about the bite");
        assert_eq!(mentioned.len(), 1);
        assert_eq!(mentioned[0].name, "Field Medic");
        assert!(state.npcs_mentioned_in("is anyone unknown here?").is_empty());
    }
}
