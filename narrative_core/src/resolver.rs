//! Turn orchestration: one player action from stat cost to applied reply.
//!
//! Order within a turn is fixed. Survival costs and combat records are
//! applied first so the assembled context already reflects them; the
//! backend reply (or the fallback) is applied last.

use game_rules::{
    Character, CombatAction, GameState, MessageRole, SurvivalStatTracker, SurvivalUpdate,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context_assembler::{is_movement, ActionCategory, ActionContextBuilder, BackendRequest};
use crate::error::BackendError;
use crate::fallback::FallbackClassifier;
use crate::response::{parse_response, ConversationUpdate, NarrativeResponse};

/// The external narrative generator.
pub trait NarrativeBackend {
    /// Produce raw reply text for one request.
    fn generate(&self, request: &BackendRequest) -> Result<String, BackendError>;
}

impl<T: NarrativeBackend + ?Sized> NarrativeBackend for Box<T> {
    fn generate(&self, request: &BackendRequest) -> Result<String, BackendError> {
        (**self).generate(request)
    }
}

/// One player action as handed over by the caller.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Action name or category, e.g. `interpret`, `attack`, `search`.
    pub action: String,
    /// Free text or the resolved mechanical result.
    pub details: String,
    /// Open a new combat round before recording `combat_actions`.
    pub new_round: bool,
    /// Mechanically resolved combat actions for this turn.
    pub combat_actions: Vec<CombatAction>,
    /// (target, effect) pairs applied this turn.
    pub status_effects: Vec<(String, String)>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
            ..Self::default()
        }
    }

    pub fn starting_round(mut self) -> Self {
        self.new_round = true;
        self
    }

    pub fn with_combat_action(mut self, action: CombatAction) -> Self {
        self.combat_actions.push(action);
        self
    }

    pub fn with_status_effect(
        mut self,
        target: impl Into<String>,
        effect: impl Into<String>,
    ) -> Self {
        self.status_effects.push((target.into(), effect.into()));
        self
    }

    /// History line for the player's side of the turn.
    fn history_line(&self, category: &ActionCategory) -> String {
        match category {
            ActionCategory::Interpret => self.details.clone(),
            _ if self.details.is_empty() => self.action.clone(),
            _ => format!("{}: {}", self.action, self.details),
        }
    }
}

/// Where the reply of a turn came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ResponseSource {
    Backend,
    Fallback { reason: String },
}

/// Everything one resolved turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub response: NarrativeResponse,
    pub source: ResponseSource,
    pub survival: SurvivalUpdate,
}

impl TurnOutcome {
    pub fn used_fallback(&self) -> bool {
        matches!(self.source, ResponseSource::Fallback { .. })
    }
}

/// Resolves player actions against a narrative backend.
pub struct ActionResolver<B> {
    backend: B,
    builder: ActionContextBuilder,
    tracker: SurvivalStatTracker,
    fallback: FallbackClassifier,
}

impl<B: NarrativeBackend> ActionResolver<B> {
    /// The builder's tier scale is taken from the tracker's meter bound.
    pub fn new(backend: B, builder: ActionContextBuilder, tracker: SurvivalStatTracker) -> Self {
        Self {
            backend,
            builder: builder.with_stat_max(tracker.config().stat_max),
            tracker,
            fallback: FallbackClassifier::new(),
        }
    }

    pub fn with_defaults(backend: B) -> Self {
        Self::new(
            backend,
            ActionContextBuilder::with_defaults(),
            SurvivalStatTracker::with_defaults(),
        )
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve one action. Never fails: backend problems degrade to the
    /// fallback reply.
    pub fn resolve(
        &self,
        character: &mut Character,
        state: &mut GameState,
        request: &ActionRequest,
    ) -> TurnOutcome {
        let category = ActionCategory::parse(&request.action);

        let survival = self
            .tracker
            .update_stats(character, &cost_key(&category, &request.details));

        record_combat(state, request);

        let backend_request = self.builder.build(&category, &request.details, character, state);

        let user_line = request.history_line(&category);
        let (response, source) = match self.ask_backend(&backend_request) {
            Ok(response) => {
                apply_response(state, &response);
                (response, ResponseSource::Backend)
            }
            Err(reason) => (
                self.fallback.respond(&user_line),
                ResponseSource::Fallback { reason },
            ),
        };

        state.add_message(MessageRole::User, user_line);
        state.add_message(MessageRole::Assistant, response.message.clone());

        TurnOutcome {
            response,
            source,
            survival,
        }
    }

    /// A usable reply, or the reason there is none.
    fn ask_backend(&self, request: &BackendRequest) -> Result<NarrativeResponse, String> {
        let raw = self.backend.generate(request).map_err(|e| {
            warn!(error = %e, "narrative backend failed");
            e.to_string()
        })?;

        let response = parse_response(&raw).map_err(|e| {
            warn!(error = %e, reply_len = raw.len(), "rejected backend reply");
            e.to_string()
        })?;

        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "backend reported failure".to_string());
            warn!(reason = %reason, "backend reply unsuccessful");
            return Err(reason);
        }
        Ok(response)
    }
}

/// Survival cost table key for an action.
fn cost_key(category: &ActionCategory, details: &str) -> String {
    match category {
        ActionCategory::Interpret if is_movement(details) => "move".to_string(),
        ActionCategory::Interpret => "interpret".to_string(),
        ActionCategory::Attack => "attack".to_string(),
        ActionCategory::Resolved => "resolved".to_string(),
        ActionCategory::RollOutcome => "roll_outcome".to_string(),
        ActionCategory::Direct(name) => name.clone(),
    }
}

fn record_combat(state: &mut GameState, request: &ActionRequest) {
    if request.combat_actions.is_empty()
        && request.status_effects.is_empty()
        && !request.new_round
    {
        return;
    }
    let Some(combat) = state.active_combat_mut() else {
        debug!(
            actions = request.combat_actions.len(),
            "combat records ignored outside an encounter"
        );
        return;
    };
    if request.new_round {
        combat.ledger.start_new_round();
    }
    for action in &request.combat_actions {
        combat.ledger.add_action(action.clone());
    }
    for (target, effect) in &request.status_effects {
        combat.ledger.add_status_effect(target.clone(), effect.clone());
    }
}

fn apply_response(state: &mut GameState, response: &NarrativeResponse) {
    if !response.current_detailed_location.trim().is_empty() {
        state.current_location = response.current_detailed_location.clone();
    }
    if !response.scene_description_update.trim().is_empty() {
        state.scene_description = response.scene_description_update.clone();
    }
    if !response.interactable_elements.is_empty() {
        state.interactable_elements = response.interactable_elements.clone();
    }
    let merged = state.merge_facts(
        response
            .new_facts
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    if merged > 0 {
        debug!(merged, "merged new facts into long-term memory");
    }
    if let Some(combat) = state.active_combat_mut() {
        combat.log.push(response.message.clone());
    }
    if let Some(update) = response.conversation_update() {
        remember_conversation(state, update);
    }
}

/// Only NPCs present in the scene get a memory entry.
fn remember_conversation(state: &mut GameState, update: ConversationUpdate) {
    let Some(name) = state.find_npc(&update.npc).map(|npc| npc.name.clone()) else {
        debug!(npc = %update.npc, "conversation with an absent npc not remembered");
        return;
    };
    let memory = state.npc_memory_mut(&name);
    memory.record(update.topics, update.shared_info, update.trust_change);
    debug!(npc = %name, trust = memory.trust, "npc memory updated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FALLBACK_LOCATION;
    use game_rules::{ActorRole, EnemySnapshot, Npc, SurvivalConfig, SurvivalStat};
    use std::cell::RefCell;

    /// Returns a fixed reply and remembers the last request.
    struct StubBackend {
        reply: Result<String, BackendError>,
        last_request: RefCell<Option<BackendRequest>>,
    }

    impl StubBackend {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last_request: RefCell::new(None),
            }
        }

        fn failing(error: BackendError) -> Self {
            Self {
                reply: Err(error),
                last_request: RefCell::new(None),
            }
        }

        fn last_context(&self) -> String {
            self.last_request
                .borrow()
                .as_ref()
                .map(|r| r.context.clone())
                .unwrap_or_default()
        }
    }

    impl NarrativeBackend for StubBackend {
        fn generate(&self, request: &BackendRequest) -> Result<String, BackendError> {
            *self.last_request.borrow_mut() = Some(request.clone());
            self.reply.clone()
        }
    }

    const CORRIDOR_REPLY: &str = r#"{
        "success": true,
        "message": "You climb out into a corridor that smells of rust.",
        "current_detailed_location": "Outer Corridor - Hatch End",
        "scene_description_update": "A long corridor lit by one flickering bulb.",
        "interpreted_action_type": "move",
        "interactable_elements": ["Flickering Bulb", "Sealed Door"],
        "new_facts": {"hatch_open": true}
    }"#;

    fn setup() -> (Character, GameState) {
        let character = Character::new("Rosa", "player-1");
        let state = GameState::at_location("shelter", "Underground Shelter", "Damp walls.");
        (character, state)
    }

    #[test]
    fn test_backend_reply_is_applied() {
        let (mut character, mut state) = setup();
        state.move_to("corridor", "Outer Corridor");
        let resolver = ActionResolver::with_defaults(StubBackend::replying(CORRIDOR_REPLY));

        let outcome = resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("interpret", "exit the shelter"),
        );

        assert_eq!(outcome.source, ResponseSource::Backend);
        assert_eq!(state.current_location, "Outer Corridor - Hatch End");
        assert_eq!(state.scene_description, "A long corridor lit by one flickering bulb.");
        assert_eq!(state.interactable_elements, vec!["Flickering Bulb", "Sealed Door"]);
        assert_eq!(state.long_term_memory["hatch_open"], serde_json::json!(true));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content, "exit the shelter");
        assert_eq!(state.messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_movement_cost_precedes_context() {
        let (mut character, mut state) = setup();
        if let Some(survival) = character.survival_stats.as_mut() {
            survival.hunger = 50;
        }
        let resolver = ActionResolver::with_defaults(StubBackend::replying(CORRIDOR_REPLY));

        let outcome = resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("interpret", "go to the corridor"),
        );

        assert!(outcome.survival.ok);
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(51));
        assert_eq!(character.survival_stat(SurvivalStat::Thirst), Some(1));
        assert!(resolver.backend().last_context().contains("Hunger: hungry"));
    }

    #[test]
    fn test_tiers_use_the_tracker_bound() {
        let (mut character, mut state) = setup();
        if let Some(survival) = character.survival_stats.as_mut() {
            survival.hunger = 60;
        }
        let config = SurvivalConfig {
            stat_max: 200,
            ..SurvivalConfig::default()
        };
        let resolver = ActionResolver::new(
            StubBackend::replying(CORRIDOR_REPLY),
            ActionContextBuilder::with_defaults(),
            SurvivalStatTracker::new(config).unwrap(),
        );

        resolver.resolve(&mut character, &mut state, &ActionRequest::new("rest", ""));

        assert!(resolver.backend().last_context().contains("Hunger: fed"));
    }

    #[test]
    fn test_talk_reply_updates_npc_memory() {
        let (mut character, mut state) = setup();
        state
            .npcs_present
            .push(Npc::new("Field Medic").with_profession("medic"));
        let reply = r#"{
            "success": true,
            "message": "\"It's clean,\" the medic says, rewrapping the bandage.",
            "current_detailed_location": "Underground Shelter - Infirmary",
            "scene_description_update": "A cot under a humming lamp.",
            "interpreted_action_type": "talk",
            "interpreted_action_details": {
                "target_npc": "field medic",
                "topics": ["the bite"],
                "shared_info": ["the wound is clean"],
                "trust_change": 150
            }
        }"#;
        let resolver = ActionResolver::with_defaults(StubBackend::replying(reply));

        resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("interpret", "ask the medic about the bite"),
        );

        let memory = state.npc_memory("Field Medic").unwrap();
        assert!(memory.topics.contains("the bite"));
        assert!(memory.shared_info.contains("the wound is clean"));
        assert_eq!(memory.trust, game_rules::TRUST_MAX);

        resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("interpret", "ask the medic again"),
        );
        assert!(resolver
            .backend()
            .last_context()
            .contains("Already told the player: the wound is clean"));
    }

    #[test]
    fn test_talk_reply_about_absent_npc_is_not_remembered() {
        let (mut character, mut state) = setup();
        let reply = r#"{
            "success": true,
            "message": "Nobody answers.",
            "current_detailed_location": "Underground Shelter",
            "scene_description_update": "Damp walls.",
            "interpreted_action_type": "talk",
            "interpreted_action_details": {"target_npc": "Ghost", "trust_change": 3}
        }"#;
        let resolver = ActionResolver::with_defaults(StubBackend::replying(reply));

        resolver.resolve(&mut character, &mut state, &ActionRequest::new("talk", "hello?"));
        assert!(state.npc_memory.is_empty());
    }

    #[test]
    fn test_backend_failure_uses_fallback() {
        let (mut character, mut state) = setup();
        let resolver = ActionResolver::with_defaults(StubBackend::failing(BackendError::Timeout));

        let outcome = resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("interpret", "attack the zombie"),
        );

        assert!(outcome.used_fallback());
        assert_eq!(
            outcome.response.interpreted_action_type.as_deref(),
            Some("combat_fallback_start")
        );
        assert_eq!(state.current_location, "Underground Shelter");
        assert_ne!(state.current_location, FALLBACK_LOCATION);
        assert_eq!(state.scene_description, "Damp walls.");
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, outcome.response.message);
    }

    #[test]
    fn test_malformed_reply_uses_fallback() {
        let (mut character, mut state) = setup();
        let resolver = ActionResolver::with_defaults(StubBackend::replying("I cannot do that."));

        let outcome = resolver.resolve(
            &mut character,
            &mut state,
            &ActionRequest::new("search", "the lockers"),
        );

        match &outcome.source {
            ResponseSource::Fallback { reason } => assert!(reason.contains("structured")),
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(
            outcome.response.interpreted_action_type.as_deref(),
            Some("search_fallback")
        );
        assert!(state.interactable_elements.is_empty());
    }

    #[test]
    fn test_unsuccessful_reply_uses_fallback() {
        let (mut character, mut state) = setup();
        let resolver = ActionResolver::with_defaults(StubBackend::replying(
            r#"{"success": false, "error": "model overloaded"}"#,
        ));

        let outcome = resolver.resolve(&mut character, &mut state, &ActionRequest::new("rest", ""));

        assert_eq!(
            outcome.source,
            ResponseSource::Fallback {
                reason: "model overloaded".to_string()
            }
        );
        assert_eq!(state.messages[0].content, "rest");
    }

    #[test]
    fn test_combat_actions_are_recorded() {
        let (mut character, mut state) = setup();
        state.start_combat(EnemySnapshot::new("Walker", 30));
        let resolver = ActionResolver::with_defaults(StubBackend::replying(CORRIDOR_REPLY));

        let request = ActionRequest::new("attack", "You hit the Walker for 7 damage")
            .starting_round()
            .with_combat_action(
                CombatAction::new(ActorRole::Player, "Rosa", "Walker", "attack")
                    .with_damage(7)
                    .with_effect("critical_hit"),
            )
            .with_status_effect("Walker", "staggered");
        let outcome = resolver.resolve(&mut character, &mut state, &request);

        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(1));
        assert_eq!(outcome.survival.changed().count(), 2);

        let context = resolver.backend().last_context();
        assert!(context.contains("Round: 1"));
        assert!(context.contains("Result of the player's last attack"));

        let combat = state.active_combat().unwrap();
        assert_eq!(combat.ledger.get_actor_statistics("Rosa").damage_dealt, 7);
        assert_eq!(
            combat.ledger.get_round_summary(1).status_effects["Walker"],
            vec!["staggered".to_string()]
        );
        assert_eq!(combat.log.len(), 1);
    }

    #[test]
    fn test_combat_records_ignored_without_encounter() {
        let (mut character, mut state) = setup();
        let resolver = ActionResolver::with_defaults(StubBackend::replying(CORRIDOR_REPLY));

        let request = ActionRequest::new("attack", "swing").with_combat_action(CombatAction::new(
            ActorRole::Player,
            "Rosa",
            "Walker",
            "attack",
        ));
        resolver.resolve(&mut character, &mut state, &request);
        assert!(state.combat.is_none());
    }

    #[test]
    fn test_infection_drains_hp_on_any_action() {
        let (mut character, mut state) = setup();
        character.stats.current_hp = 8;
        if let Some(survival) = character.survival_stats.as_mut() {
            survival.infection_risk = 51;
        }
        let resolver = ActionResolver::with_defaults(StubBackend::replying(CORRIDOR_REPLY));

        let outcome =
            resolver.resolve(&mut character, &mut state, &ActionRequest::new("look", "around"));

        assert_eq!(character.stats.current_hp, 0);
        assert_eq!(outcome.survival.changed().count(), 0);
        assert!(outcome.survival.messages.iter().any(|m| m.contains("infection")));
    }
}
