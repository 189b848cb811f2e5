//! Bounded survival meter updates and infection consequences.
//!
//! Every action may carry a meter cost (see [`SurvivalConfig::action_costs`]).
//! Costs are applied one meter at a time through [`SurvivalStatTracker::update_stat`],
//! which clamps into `[stat_min, stat_max]`; afterwards the infection check
//! drains HP while infection risk sits above the threshold.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SurvivalConfig;
use crate::entities::{Character, SurvivalStat};
use crate::error::RulesError;

pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;
pub const INFECTION_RISK_THRESHOLD: i32 = 50;
pub const HP_DAMAGE_FROM_INFECTION: i32 = 10;

/// Outcome of one bounded meter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatUpdate {
    Changed {
        stat: SurvivalStat,
        from: i32,
        to: i32,
    },
    /// The clamped value equals the current one.
    Unchanged { stat: SurvivalStat },
    /// The character has no survival block to update.
    Unavailable { stat: SurvivalStat },
}

impl StatUpdate {
    pub fn is_changed(&self) -> bool {
        matches!(self, StatUpdate::Changed { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StatUpdate::Unavailable { .. })
    }
}

/// Outcome of the infection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InfectionOutcome {
    /// HP was drained this call.
    Damaged { hp_lost: i32, current_hp: i32 },
    /// Risk at or below threshold, or HP already at zero.
    Clear,
    /// No infection risk meter to read.
    Unavailable,
}

/// Status record returned by [`SurvivalStatTracker::update_stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalUpdate {
    /// False if any required meter was missing.
    pub ok: bool,
    /// One human-readable line per meter that changed, plus infection damage.
    pub messages: Vec<String>,
    pub updates: Vec<StatUpdate>,
    pub infection: InfectionOutcome,
}

impl SurvivalUpdate {
    /// Meters that actually moved this call.
    pub fn changed(&self) -> impl Iterator<Item = &StatUpdate> {
        self.updates.iter().filter(|u| u.is_changed())
    }
}

/// Applies action costs and infection damage to a character.
#[derive(Debug, Clone, Default)]
pub struct SurvivalStatTracker {
    config: SurvivalConfig,
}

impl SurvivalStatTracker {
    /// Fails if the bounds are inverted or infection damage is negative.
    pub fn new(config: SurvivalConfig) -> Result<Self, RulesError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &SurvivalConfig {
        &self.config
    }

    /// Charge the cost of `action` and then run the infection check.
    ///
    /// Unknown actions cost nothing, but the infection check still runs.
    pub fn update_stats(&self, character: &mut Character, action: &str) -> SurvivalUpdate {
        let mut messages = Vec::new();
        let mut updates = Vec::new();

        if let Some(cost) = self.config.cost_of(action).copied() {
            for (stat, delta) in cost.deltas() {
                let update = self.update_stat(character, stat, delta);
                if let StatUpdate::Changed { stat, from, to } = update {
                    messages.push(describe_change(&character.name, stat, from, to));
                }
                updates.push(update);
            }
        }

        let infection = self.check_infection(character);
        if let InfectionOutcome::Damaged { hp_lost, current_hp } = infection {
            messages.push(format!(
                "{} loses {} HP to infection ({} HP left).",
                character.name, hp_lost, current_hp
            ));
        }

        let ok = !updates.iter().any(StatUpdate::is_unavailable)
            && infection != InfectionOutcome::Unavailable;

        SurvivalUpdate {
            ok,
            messages,
            updates,
            infection,
        }
    }

    /// Add `delta` to one meter, clamped into the configured bounds.
    pub fn update_stat(
        &self,
        character: &mut Character,
        stat: SurvivalStat,
        delta: i32,
    ) -> StatUpdate {
        let (min, max) = (self.config.stat_min, self.config.stat_max);
        let Some(value) = character.survival_stat_mut(stat) else {
            debug!(character = %character.name, %stat, "no survival block, skipping update");
            return StatUpdate::Unavailable { stat };
        };

        let current = *value;
        let new = current.saturating_add(delta).clamp(min, max);
        if new == current {
            return StatUpdate::Unchanged { stat };
        }

        *value = new;
        debug!(
            character = %character.name,
            %stat,
            from = current,
            to = new,
            "survival stat changed"
        );
        StatUpdate::Changed {
            stat,
            from: current,
            to: new,
        }
    }

    /// Drain HP if infection risk is strictly above the threshold.
    ///
    /// Risk itself is never raised here.
    pub fn check_infection(&self, character: &mut Character) -> InfectionOutcome {
        let Some(risk) = character.survival_stat(SurvivalStat::InfectionRisk) else {
            return InfectionOutcome::Unavailable;
        };
        if risk <= self.config.infection_risk_threshold {
            return InfectionOutcome::Clear;
        }

        let hp_lost = character
            .stats
            .take_damage(self.config.hp_damage_from_infection);
        if hp_lost == 0 {
            return InfectionOutcome::Clear;
        }

        info!(
            character = %character.name,
            infection_risk = risk,
            hp_lost,
            current_hp = character.stats.current_hp,
            "infection drained hp"
        );
        InfectionOutcome::Damaged {
            hp_lost,
            current_hp: character.stats.current_hp,
        }
    }
}

fn describe_change(name: &str, stat: SurvivalStat, from: i32, to: i32) -> String {
    let label = stat.name().replace('_', " ");
    let direction = if to > from { "rose" } else { "fell" };
    format!("{name}'s {label} {direction} from {from} to {to}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SurvivalStats;

    fn survivor() -> Character {
        Character::new("Rosa", "player-1")
    }

    fn with_meters(hunger: i32, thirst: i32, infection_risk: i32) -> Character {
        let mut character = survivor();
        character.survival_stats = Some(SurvivalStats {
            hunger,
            thirst,
            infection_risk,
        });
        character
    }

    #[test]
    fn test_move_costs_hunger_and_thirst() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(10, 20, 0);

        let update = tracker.update_stats(&mut character, "move");

        assert!(update.ok);
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(11));
        assert_eq!(character.survival_stat(SurvivalStat::Thirst), Some(21));
        assert_eq!(update.messages.len(), 2);
        assert!(update.messages[0].contains("hunger rose from 10 to 11"));
        assert_eq!(update.infection, InfectionOutcome::Clear);
    }

    #[test]
    fn test_unknown_action_costs_nothing() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(10, 20, 0);

        let update = tracker.update_stats(&mut character, "meditate");

        assert!(update.ok);
        assert!(update.updates.is_empty());
        assert!(update.messages.is_empty());
        assert_eq!(
            character.survival_stats,
            Some(SurvivalStats {
                hunger: 10,
                thirst: 20,
                infection_risk: 0,
            })
        );
    }

    #[test]
    fn test_update_stat_clamps_upward() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(95, 0, 0);

        for _ in 0..10 {
            tracker.update_stat(&mut character, SurvivalStat::Hunger, 3);
            assert!(character.survival_stat(SurvivalStat::Hunger).unwrap() <= STAT_MAX);
        }
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(STAT_MAX));
        assert_eq!(
            tracker.update_stat(&mut character, SurvivalStat::Hunger, 1),
            StatUpdate::Unchanged {
                stat: SurvivalStat::Hunger
            }
        );
    }

    #[test]
    fn test_update_stat_clamps_downward() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(0, 4, 0);

        let update = tracker.update_stat(&mut character, SurvivalStat::Thirst, -10);
        assert_eq!(
            update,
            StatUpdate::Changed {
                stat: SurvivalStat::Thirst,
                from: 4,
                to: STAT_MIN
            }
        );

        for _ in 0..5 {
            tracker.update_stat(&mut character, SurvivalStat::Thirst, -7);
            assert_eq!(character.survival_stat(SurvivalStat::Thirst), Some(STAT_MIN));
        }
    }

    #[test]
    fn test_update_stat_extreme_delta_does_not_overflow() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(50, 0, 0);

        tracker.update_stat(&mut character, SurvivalStat::Hunger, i32::MAX);
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(STAT_MAX));
    }

    #[test]
    fn test_missing_survival_block_is_reported_not_raised() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = survivor();
        character.survival_stats = None;

        let update = tracker.update_stats(&mut character, "move");

        assert!(!update.ok);
        assert!(update.updates.iter().all(StatUpdate::is_unavailable));
        assert_eq!(update.infection, InfectionOutcome::Unavailable);
        assert!(update.messages.is_empty());
        assert_eq!(character.stats.current_hp, 100);
    }

    #[test]
    fn test_infection_never_drives_hp_negative() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(0, 0, 51);
        character.stats.current_hp = 8;

        let update = tracker.update_stats(&mut character, "look");

        assert_eq!(character.stats.current_hp, 0);
        assert_eq!(
            update.infection,
            InfectionOutcome::Damaged {
                hp_lost: 8,
                current_hp: 0
            }
        );
        assert!(update.messages[0].contains("Rosa loses 8 HP"));
    }

    #[test]
    fn test_infection_threshold_is_strict() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(0, 0, INFECTION_RISK_THRESHOLD);

        let update = tracker.update_stats(&mut character, "move");

        assert_eq!(update.infection, InfectionOutcome::Clear);
        assert_eq!(character.stats.current_hp, 100);
    }

    #[test]
    fn test_infection_fires_once_per_call() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(0, 0, 80);

        tracker.update_stats(&mut character, "move");
        assert_eq!(character.stats.current_hp, 100 - HP_DAMAGE_FROM_INFECTION);

        tracker.update_stats(&mut character, "rest");
        assert_eq!(character.stats.current_hp, 100 - 2 * HP_DAMAGE_FROM_INFECTION);
        assert_eq!(character.survival_stat(SurvivalStat::InfectionRisk), Some(80));
    }

    #[test]
    fn test_infection_at_zero_hp_is_clear() {
        let tracker = SurvivalStatTracker::with_defaults();
        let mut character = with_meters(0, 0, 90);
        character.stats.current_hp = 0;

        assert_eq!(tracker.check_infection(&mut character), InfectionOutcome::Clear);
    }

    #[test]
    fn test_custom_config_costs() {
        let mut config = SurvivalConfig::default();
        config.action_costs.insert(
            "dig".to_string(),
            crate::config::ActionCost {
                hunger: 2,
                thirst: 0,
                infection_risk: 5,
            },
        );
        let tracker = SurvivalStatTracker::new(config).unwrap();
        let mut character = with_meters(0, 0, 48);

        let update = tracker.update_stats(&mut character, "dig");

        assert_eq!(update.changed().count(), 2);
        assert_eq!(character.survival_stat(SurvivalStat::InfectionRisk), Some(53));
        // risk crossed the threshold this call, so the check fires immediately
        assert_eq!(character.stats.current_hp, 90);
    }

    #[test]
    fn test_inverted_bounds_rejected_at_construction() {
        let config = SurvivalConfig {
            stat_min: 50,
            stat_max: 10,
            ..SurvivalConfig::default()
        };
        assert!(matches!(
            SurvivalStatTracker::new(config),
            Err(RulesError::ConfigValue(_))
        ));

        let negative_damage = SurvivalConfig {
            hp_damage_from_infection: -3,
            ..SurvivalConfig::default()
        };
        assert!(SurvivalStatTracker::new(negative_damage).is_err());
    }

    #[test]
    fn test_narrow_bounds_clamp_every_update() {
        let config = SurvivalConfig {
            stat_min: 10,
            stat_max: 10,
            ..SurvivalConfig::default()
        };
        let tracker = SurvivalStatTracker::new(config).unwrap();
        let mut character = with_meters(4, 30, 0);

        let update = tracker.update_stats(&mut character, "move");

        assert!(update.ok);
        assert_eq!(character.survival_stat(SurvivalStat::Hunger), Some(10));
        assert_eq!(character.survival_stat(SurvivalStat::Thirst), Some(10));
    }
}
