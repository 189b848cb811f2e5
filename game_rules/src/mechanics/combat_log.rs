//! Per-encounter combat ledger.
//!
//! The ledger records every action of an encounter grouped into rounds and
//! derives statistics and highlight moments from that record. Nothing is
//! aggregated at write time: totals are computed by scanning the rounds, so
//! they can be split by [`ActorRole`] after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Effect tag marking a critical hit.
pub const CRITICAL_HIT: &str = "critical_hit";
/// Effect tag marking a dodged attack.
pub const DODGE: &str = "dodge";
/// Effect tag marking a killing blow.
pub const KILL: &str = "kill";
/// Effect tag marking a bite or scratch that passed the infection on.
pub const INFECTED: &str = "infected";

/// Healing strictly above this amount is a highlight.
pub const LARGE_HEAL_THRESHOLD: i32 = 5;

/// Maximum number of highlights returned.
pub const MAX_HIGHLIGHTS: usize = 3;

/// Which side of the encounter an actor fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Player,
    Opponent,
    Npc,
}

/// One recorded action. Immutable once added to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatAction {
    pub actor: String,
    pub role: ActorRole,
    pub target: String,
    pub action_type: String,
    pub damage: Option<i32>,
    pub healing: Option<i32>,
    pub effects: Vec<String>,
    #[serde(default)]
    pub headshot: bool,
    /// The attack could transmit the infection. Whether it did is the
    /// [`INFECTED`] effect.
    #[serde(default)]
    pub infection_attempted: bool,
    pub timestamp: DateTime<Utc>,
}

impl CombatAction {
    pub fn new(
        role: ActorRole,
        actor: impl Into<String>,
        target: impl Into<String>,
        action_type: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            role,
            target: target.into(),
            action_type: action_type.into(),
            damage: None,
            healing: None,
            effects: Vec::new(),
            headshot: false,
            infection_attempted: false,
            timestamp: Utc::now(),
        }
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn with_healing(mut self, healing: i32) -> Self {
        self.healing = Some(healing);
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effects.push(effect.into());
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.effects.extend(effects.into_iter().map(Into::into));
        self
    }

    pub fn as_headshot(mut self) -> Self {
        self.headshot = true;
        self
    }

    pub fn attempting_infection(mut self) -> Self {
        self.infection_attempted = true;
        self
    }

    pub fn has_effect(&self, marker: &str) -> bool {
        self.effects.iter().any(|e| e == marker)
    }

    pub fn is_critical(&self) -> bool {
        self.has_effect(CRITICAL_HIT)
    }

    pub fn is_dodge(&self) -> bool {
        self.has_effect(DODGE)
    }

    pub fn is_kill(&self) -> bool {
        self.has_effect(KILL)
    }

    /// An infection attempt that took hold.
    pub fn caused_infection(&self) -> bool {
        self.infection_attempted && self.has_effect(INFECTED)
    }
}

/// One exchange of actions within an encounter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatRound {
    /// 1-based.
    pub round_number: u32,
    pub actions: Vec<CombatAction>,
    /// Target name -> status effect tags applied this round.
    pub status_effects: BTreeMap<String, Vec<String>>,
}

impl CombatRound {
    fn new(round_number: u32) -> Self {
        Self {
            round_number,
            ..Default::default()
        }
    }
}

/// Flattened view of an action inside a [`RoundSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub actor: String,
    pub role: ActorRole,
    pub target: String,
    pub action_type: String,
    pub damage: Option<i32>,
    pub healing: Option<i32>,
    pub effects: Vec<String>,
    pub headshot: bool,
    pub infection_attempted: bool,
}

impl From<&CombatAction> for ActionSummary {
    fn from(action: &CombatAction) -> Self {
        Self {
            actor: action.actor.clone(),
            role: action.role,
            target: action.target.clone(),
            action_type: action.action_type.clone(),
            damage: action.damage,
            healing: action.healing,
            effects: action.effects.clone(),
            headshot: action.headshot,
            infection_attempted: action.infection_attempted,
        }
    }
}

/// Summary of one round. The default value (round 0, no actions) stands in
/// for rounds that do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    pub actions: Vec<ActionSummary>,
    pub status_effects: BTreeMap<String, Vec<String>>,
}

impl RoundSummary {
    pub fn is_empty(&self) -> bool {
        self.round == 0
    }
}

/// Per-actor aggregate over the whole encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorStatistics {
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub healing_done: i32,
    pub critical_hits: u32,
    pub headshots: u32,
    pub infections_caused: u32,
    pub actions_taken: u32,
}

/// Encounter-wide totals, optionally restricted to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncounterStatistics {
    pub total_damage_dealt: i32,
    pub total_healing: i32,
    pub critical_hits: u32,
    pub dodges: u32,
    pub kills: u32,
    pub headshots: u32,
    pub infection_attempts: u32,
    pub infections: u32,
}

impl EncounterStatistics {
    fn record(&mut self, action: &CombatAction) {
        self.total_damage_dealt += action.damage.unwrap_or(0);
        self.total_healing += action.healing.unwrap_or(0);
        if action.is_critical() {
            self.critical_hits += 1;
        }
        if action.is_dodge() {
            self.dodges += 1;
        }
        if action.is_kill() {
            self.kills += 1;
        }
        if action.headshot {
            self.headshots += 1;
        }
        if action.infection_attempted {
            self.infection_attempts += 1;
        }
        if action.caused_infection() {
            self.infections += 1;
        }
    }
}

/// Kinds of highlight moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    CriticalHit,
    LargeHeal,
    Dodge,
    Kill,
    Headshot,
    Infection,
}

/// A notable moment worth retelling after the fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMoment {
    pub kind: HighlightKind,
    pub round: u32,
    pub description: String,
}

impl HighlightMoment {
    /// Kills outrank criticals, criticals outrank the rest, later rounds
    /// outrank earlier ones.
    fn rank(&self) -> (bool, bool, u32) {
        (
            self.kind == HighlightKind::Kill,
            self.kind == HighlightKind::CriticalHit,
            self.round,
        )
    }
}

/// Ledger for one active encounter. Dropped when the encounter ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatLedger {
    rounds: Vec<CombatRound>,
}

impl CombatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of the round currently accepting actions, or 0 before the
    /// first round.
    pub fn current_round(&self) -> u32 {
        self.rounds.last().map(|r| r.round_number).unwrap_or(0)
    }

    pub fn rounds(&self) -> &[CombatRound] {
        &self.rounds
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Open the next round.
    pub fn start_new_round(&mut self) -> u32 {
        let number = self.current_round() + 1;
        self.rounds.push(CombatRound::new(number));
        debug!(round = number, "combat round started");
        number
    }

    fn active_round(&mut self) -> &mut CombatRound {
        if self.rounds.is_empty() {
            self.start_new_round();
        }
        let last = self.rounds.len() - 1;
        &mut self.rounds[last]
    }

    /// Record an action in the current round, opening round 1 if needed.
    pub fn add_action(&mut self, action: CombatAction) {
        self.active_round().actions.push(action);
    }

    /// Record a status effect on `target` in the current round.
    pub fn add_status_effect(&mut self, target: impl Into<String>, effect: impl Into<String>) {
        self.active_round()
            .status_effects
            .entry(target.into())
            .or_default()
            .push(effect.into());
    }

    fn actions(&self) -> impl Iterator<Item = (u32, &CombatAction)> {
        self.rounds
            .iter()
            .flat_map(|r| r.actions.iter().map(move |a| (r.round_number, a)))
    }

    /// Summary of the 1-indexed round `n`, or an empty summary if out of range.
    pub fn get_round_summary(&self, n: u32) -> RoundSummary {
        let Some(index) = (n as usize).checked_sub(1) else {
            return RoundSummary::default();
        };
        match self.rounds.get(index) {
            Some(round) => RoundSummary {
                round: n,
                actions: round.actions.iter().map(ActionSummary::from).collect(),
                status_effects: round.status_effects.clone(),
            },
            None => RoundSummary::default(),
        }
    }

    /// Aggregate for one participant. Dealing and taking damage are counted
    /// independently, so self-inflicted damage shows up on both sides.
    pub fn get_actor_statistics(&self, name: &str) -> ActorStatistics {
        let mut stats = ActorStatistics::default();
        for (_, action) in self.actions() {
            if action.actor == name {
                stats.actions_taken += 1;
                stats.damage_dealt += action.damage.unwrap_or(0);
                stats.healing_done += action.healing.unwrap_or(0);
                if action.is_critical() {
                    stats.critical_hits += 1;
                }
                if action.headshot {
                    stats.headshots += 1;
                }
                if action.caused_infection() {
                    stats.infections_caused += 1;
                }
            }
            if action.target == name {
                stats.damage_taken += action.damage.unwrap_or(0);
            }
        }
        stats
    }

    /// Totals across every action in the encounter, both sides combined.
    pub fn encounter_statistics(&self) -> EncounterStatistics {
        let mut stats = EncounterStatistics::default();
        for (_, action) in self.actions() {
            stats.record(action);
        }
        stats
    }

    /// Totals restricted to actions taken by one side.
    pub fn encounter_statistics_for(&self, role: ActorRole) -> EncounterStatistics {
        let mut stats = EncounterStatistics::default();
        for (_, action) in self.actions().filter(|(_, a)| a.role == role) {
            stats.record(action);
        }
        stats
    }

    /// The most notable moments, best first, at most [`MAX_HIGHLIGHTS`].
    pub fn get_highlight_moments(&self) -> Vec<HighlightMoment> {
        let mut highlights = Vec::new();

        for (round, action) in self.actions() {
            if action.is_critical() {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::CriticalHit,
                    round,
                    description: format!(
                        "{} landed a CRITICAL HIT on {} for {} damage!",
                        action.actor,
                        action.target,
                        action.damage.unwrap_or(0)
                    ),
                });
            }
            if let Some(healing) = action.healing.filter(|h| *h > LARGE_HEAL_THRESHOLD) {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::LargeHeal,
                    round,
                    description: format!(
                        "{} healed {} for {} hit points!",
                        action.actor, action.target, healing
                    ),
                });
            }
            if action.is_dodge() {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::Dodge,
                    round,
                    description: format!(
                        "{} deftly dodged {}'s attack!",
                        action.target, action.actor
                    ),
                });
            }
            if action.is_kill() {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::Kill,
                    round,
                    description: format!("{} brought down {}!", action.actor, action.target),
                });
            }
            if action.headshot {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::Headshot,
                    round,
                    description: format!(
                        "{} landed a HEADSHOT on {} for {} damage!",
                        action.actor,
                        action.target,
                        action.damage.unwrap_or(0)
                    ),
                });
            }
            if action.caused_infection() {
                highlights.push(HighlightMoment {
                    kind: HighlightKind::Infection,
                    round,
                    description: format!(
                        "{} was INFECTED by {}'s attack!",
                        action.target, action.actor
                    ),
                });
            }
        }

        // stable: equal ranks keep recording order
        highlights.sort_by(|a, b| b.rank().cmp(&a.rank()));
        highlights.truncate(MAX_HIGHLIGHTS);
        highlights
    }
}
