//! Action Context Builder - Assembles the backend request for one player turn.
//!
//! The context is a pipeline of small fragments, each built from the slice
//! of state it needs:
//! 1. **Setting**: world and tone
//! 2. **Scene**: location, NPCs, events, interactables
//! 3. **Memory**: running summary and long-term facts
//! 4. **Character**: abilities, condition tiers, inventory
//! 5. **Combat**: enemy snapshot and last outcome (active encounters only)
//! 6. **History**: recent messages, oldest first
//! 7. **Task**: category instructions, then sub-intent rules, then general rules
//! 8. **Format**: the response contract, always last

mod guidelines;
mod tiers;

pub use guidelines::*;
pub use tiers::*;

use game_rules::{Character, GameState, StatType, SurvivalStat, INFECTION_RISK_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ContextConfig;
use crate::keywords::{self, KeywordRule};

/// Free-text fragments that signal the player wants to go somewhere.
pub const MOVEMENT_RULES: &[KeywordRule<Intent>] = &[KeywordRule::new(
    Intent::Move,
    &[
        "exit", "leave", "enter", "go to", "head to", "walk to", "move to", "return to",
        "go back", "north", "south", "east", "west", "corridor", "stairs", "outside",
    ],
)];

/// Words in a resolved attack description that mark a mechanical outcome.
const ATTACK_OUTCOME_KEYWORDS: &[&str] = &["hit", "miss", "defeat"];

/// True if free-form action text expresses movement.
pub fn is_movement(text: &str) -> bool {
    keywords::classify(MOVEMENT_RULES, text).is_some()
}

/// How the caller has already classified the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// Free-form text the backend must interpret.
    Interpret,
    /// An attack; the outcome is resolved by the caller when combat is active.
    Attack,
    /// A mechanical result already computed by the game rules.
    Resolved,
    /// The outcome of a skill or attribute check.
    RollOutcome,
    /// Any other pre-classified action, by name.
    Direct(String),
}

impl ActionCategory {
    pub fn parse(action: &str) -> Self {
        let action = action.trim().to_lowercase();
        match action.as_str() {
            "interpret" => ActionCategory::Interpret,
            "attack" => ActionCategory::Attack,
            "roll_outcome" | "narrate_roll_outcome" => ActionCategory::RollOutcome,
            a if a.contains("resolved") || a.contains("success") || a.contains("fail") => {
                ActionCategory::Resolved
            }
            _ => ActionCategory::Direct(action),
        }
    }
}

/// The two strings sent to the narrative backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Fixed persona, language and tone instruction.
    pub system: String,
    /// Per-turn assembled context.
    pub context: String,
}

/// Builds backend requests from the current character and game state.
///
/// Read-only over its inputs. Survival costs and combat records for this
/// turn must be applied before calling it, so the context reflects them.
#[derive(Debug, Clone, Default)]
pub struct ActionContextBuilder {
    config: ContextConfig,
}

impl ActionContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ContextConfig::default())
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Align the hunger and thirst tiers with the rules' meter bound.
    pub fn with_stat_max(mut self, stat_max: i32) -> Self {
        self.config.stat_max = stat_max;
        self
    }

    /// The static system instruction.
    pub fn system_instruction(&self) -> String {
        system_instruction(&self.config)
    }

    /// Assemble the per-turn context string.
    pub fn build_context(
        &self,
        category: &ActionCategory,
        details: &str,
        character: &Character,
        state: &GameState,
    ) -> String {
        let fragments = [
            self.setting_fragment(),
            scene_fragment(state),
            memory_fragment(state),
            character_fragment(character, self.config.stat_max),
            combat_fragment(state, category, details),
            history_fragment(state, self.config.history_window),
            category_instructions(category, details, state),
            self.sub_intent_rules(category, details, state),
            general_rules(),
            response_format(&self.config.response_language),
        ];

        let context = fragments
            .iter()
            .filter(|f| !f.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            category = ?category,
            context_len = context.len(),
            "assembled action context"
        );
        context
    }

    /// Build both strings for the backend.
    pub fn build(
        &self,
        category: &ActionCategory,
        details: &str,
        character: &Character,
        state: &GameState,
    ) -> BackendRequest {
        BackendRequest {
            system: self.system_instruction(),
            context: self.build_context(category, details, character, state),
        }
    }

    fn setting_fragment(&self) -> String {
        format!(
            "## Setting\nYou are the Game Master of {}. Keep the narration immersive. \
             NPCs act logically for their profession and for people trying to survive. \
             ALWAYS ANSWER IN {}.\n",
            self.config.setting,
            self.config.response_language.to_uppercase()
        )
    }

    /// Conditional narrative rules for the intent(s) in play this turn.
    fn sub_intent_rules(
        &self,
        category: &ActionCategory,
        details: &str,
        state: &GameState,
    ) -> String {
        let intents: Vec<Intent> = match category {
            ActionCategory::Interpret if is_movement(details) => vec![Intent::Move],
            ActionCategory::Interpret => Intent::INTERPRETABLE.to_vec(),
            ActionCategory::Attack => vec![Intent::Attack],
            ActionCategory::Direct(name) => {
                vec![Intent::from_action(name).unwrap_or(Intent::CustomComplex)]
            }
            ActionCategory::Resolved | ActionCategory::RollOutcome => return String::new(),
        };

        let mut out = String::from("## Intent rules (apply those matching the action)\n");
        for intent in intents {
            match intent {
                Intent::Talk => {
                    let question = is_question(details, &self.config.question_openers);
                    let npcs: Vec<_> = state
                        .npcs_mentioned_in(details)
                        .into_iter()
                        .map(|npc| (npc, state.npc_memory(&npc.name)))
                        .collect();
                    out.push_str(&talk_guideline(details, question, &npcs));
                }
                Intent::VocalAction => out.push_str(&vocal_action_guideline(NOISE_RULE_NUMBER)),
                other => {
                    if let Some(template) = other.template() {
                        out.push_str(template);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn scene_fragment(state: &GameState) -> String {
    let location = if state.current_location.is_empty() {
        "Unknown"
    } else {
        state.current_location.as_str()
    };
    let mut out = format!(
        "## Scene\nLocation: {}\nDescription: {}\n",
        location, state.scene_description
    );
    if state.npcs_present.is_empty() {
        out.push_str("NPCs present: None\n");
    } else {
        out.push_str("NPCs present:\n");
        for npc in &state.npcs_present {
            out.push_str(&npc_summary(npc));
        }
    }
    out.push_str(&format!("Active events: {}\n", or_none(&state.events)));
    if !state.interactable_elements.is_empty() {
        out.push_str(&format!(
            "Interactable elements: {}\n",
            state.interactable_elements.join(", ")
        ));
    }
    out
}

fn memory_fragment(state: &GameState) -> String {
    if state.summary.is_empty() && state.long_term_memory.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Story so far\n");
    if !state.summary.is_empty() {
        out.push_str(&state.summary);
        out.push('\n');
    }
    for (key, value) in &state.long_term_memory {
        match value {
            serde_json::Value::String(s) => out.push_str(&format!("- {key}: {s}\n")),
            other => out.push_str(&format!("- {key}: {other}\n")),
        }
    }
    out
}

fn character_fragment(character: &Character, stat_max: i32) -> String {
    let stats = &character.stats;
    let abilities: Vec<String> = StatType::ALL
        .iter()
        .map(|&s| format!("{} {} ({:+})", s.abbreviation(), stats.score(s), stats.modifier(s)))
        .collect();

    let mut out = format!(
        "## Player character\nName: {} (level {})\nAbilities: {}\nHealth: {}\nStamina: {}\n",
        character.name,
        character.level,
        abilities.join(", "),
        HealthTier::from_hp(stats.current_hp, stats.max_hp).label(),
        StaminaTier::from_stamina(stats.current_stamina, stats.max_stamina).label(),
    );

    if let Some(hunger) = character.survival_stat(SurvivalStat::Hunger) {
        let tier = HungerTier::from_meter(hunger, stat_max);
        out.push_str(&format!("Hunger: {}\n", tier.label()));
    }
    if let Some(thirst) = character.survival_stat(SurvivalStat::Thirst) {
        let tier = ThirstTier::from_meter(thirst, stat_max);
        out.push_str(&format!("Thirst: {}\n", tier.label()));
    }
    if character
        .survival_stat(SurvivalStat::InfectionRisk)
        .is_some_and(|risk| risk > INFECTION_RISK_THRESHOLD)
    {
        out.push_str("Infection: symptomatic, losing strength\n");
    }

    let items: Vec<String> = character
        .inventory
        .iter()
        .map(|entry| match entry.quantity() {
            1 => entry.name().to_string(),
            n => format!("{} x{}", entry.name(), n),
        })
        .collect();
    out.push_str(&format!("Inventory: {}\n", or_none(&items)));

    if !character.equipment.is_empty() {
        let mut slots: Vec<_> = character.equipment.iter().collect();
        slots.sort();
        let equipped: Vec<String> = slots
            .into_iter()
            .map(|(slot, item)| format!("{slot}: {item}"))
            .collect();
        out.push_str(&format!("Equipped: {}\n", equipped.join(", ")));
    }
    out.push_str("Stay consistent with these condition tiers in the narration.\n");
    out
}

fn combat_fragment(state: &GameState, category: &ActionCategory, details: &str) -> String {
    let Some(combat) = state.active_combat() else {
        return String::new();
    };
    let mut out = String::from("## Combat\n");
    if let Some(enemy) = &combat.enemy {
        out.push_str(&format!(
            "Enemy: {} ({}/{} HP)\n",
            enemy.name, enemy.health, enemy.max_health
        ));
    }
    let round = combat.ledger.current_round();
    if round > 0 {
        out.push_str(&format!("Round: {round}\n"));
    }
    let mechanical = matches!(category, ActionCategory::Attack | ActionCategory::Resolved);
    if mechanical && keywords::contains_any(&details.to_lowercase(), ATTACK_OUTCOME_KEYWORDS) {
        out.push_str(&format!("Result of the player's last attack: {details}\n"));
    }
    out
}

fn history_fragment(state: &GameState, window: usize) -> String {
    let recent = state.recent_messages(window);
    if recent.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Recent history (oldest first)\n");
    for message in recent {
        out.push_str(&format!("- {}: {}\n", message.role, message.content));
    }
    out
}

fn category_instructions(category: &ActionCategory, details: &str, state: &GameState) -> String {
    let mut out = String::from("## Task\n");
    match category {
        ActionCategory::Interpret if is_movement(details) => {
            let origin = state
                .previous_location
                .as_deref()
                .unwrap_or("their previous location");
            out.push_str(&format!(
                "Player's movement: {details}\n\
                 The move is already resolved: the player left {origin} and has arrived at {dest}.\n\
                 1. Narrate leaving {origin} and arriving at {dest}, and what the player sees and feels on arrival.\n\
                 2. `current_detailed_location` MUST be a detailed name within {dest}; \
                 `scene_description_update` MUST describe that place.\n\
                 3. Set `interpreted_action_type` to \"move\" and list `interactable_elements` of the new place.\n",
                dest = state.current_location,
            ));
        }
        ActionCategory::Interpret => {
            let intents: Vec<&str> = Intent::INTERPRETABLE.iter().map(Intent::as_str).collect();
            out.push_str(&format!(
                "Player's free-form action: {details}\n\
                 1. Classify the intent as one of: {}.\n\
                 2. Narrate the result as Game Master, applying the matching intent rules below.\n\
                 3. Use ONLY the elements the player referenced this turn. Do not bring in \
                 objects or people from earlier descriptions the player did not mention.\n\
                 4. Fill `interpreted_action_type` and `interpreted_action_details`.\n",
                intents.join(", ")
            ));
        }
        ActionCategory::Attack => match state.active_combat().and_then(|c| c.enemy.as_ref()) {
            Some(enemy) => out.push_str(&format!(
                "The player is fighting {} and performs: {}\n\
                 The mechanical outcome is already computed. Narrate it vividly and exactly as \
                 given; never invent hits, misses or damage numbers.\n",
                enemy.name,
                if details.is_empty() { "an attack" } else { details }
            )),
            None => out.push_str(&format!(
                "The player attacks: {details}\n\
                 No fight is active yet. Narrate the start of the confrontation: the player \
                 readying themselves and the target's reaction, without resolving the blow.\n"
            )),
        },
        ActionCategory::Resolved => out.push_str(&format!(
            "Mechanical result of the player's action: {details}\n\
             Narrate this result and its immediate consequences, and update the scene to \
             match. Do not reinterpret the player's original intent.\n"
        )),
        ActionCategory::RollOutcome => out.push_str(&format!(
            "Outcome of a resolved check: {details}\n\
             Narrate the consequences of this outcome only. Do not roll again or change it.\n"
        )),
        ActionCategory::Direct(name) => {
            out.push_str(&format!("Player's direct action: {name}"));
            if !details.is_empty() {
                out.push_str(&format!(" (details: {details})"));
            }
            out.push_str("\nNarrate this direct action and its consequences.\n");
        }
    }
    out
}
