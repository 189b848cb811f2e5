//! Tunable rules configuration, loadable from TOML.
//!
//! Every field defaults to the fixed constants in [`crate::mechanics`], so an
//! empty file (or no file at all) yields the stock rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::entities::SurvivalStat;
use crate::error::RulesError;
use crate::mechanics::{
    HP_DAMAGE_FROM_INFECTION, INFECTION_RISK_THRESHOLD, STAT_MAX, STAT_MIN,
};

/// Root of the rules configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub survival: SurvivalConfig,
}

impl RulesConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, RulesError> {
        let config: RulesConfig = toml::from_str(text)?;
        config.survival.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RulesError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Survival meter bounds, infection consequences, and per-action costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    pub stat_min: i32,
    pub stat_max: i32,
    /// Infection drains HP only when risk is strictly above this value.
    pub infection_risk_threshold: i32,
    pub hp_damage_from_infection: i32,
    /// Action name -> meter deltas. Unlisted actions cost nothing.
    pub action_costs: HashMap<String, ActionCost>,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        let travel = ActionCost {
            hunger: 1,
            thirst: 1,
            infection_risk: 0,
        };
        let action_costs = ["move", "attack", "flee", "craft"]
            .into_iter()
            .map(|action| (action.to_string(), travel))
            .collect();

        Self {
            stat_min: STAT_MIN,
            stat_max: STAT_MAX,
            infection_risk_threshold: INFECTION_RISK_THRESHOLD,
            hp_damage_from_infection: HP_DAMAGE_FROM_INFECTION,
            action_costs,
        }
    }
}

impl SurvivalConfig {
    /// Cost of an action; unknown actions map to `None` (zero cost).
    pub fn cost_of(&self, action: &str) -> Option<&ActionCost> {
        self.action_costs.get(action)
    }

    /// Reject bounds and damage values the mechanics cannot apply.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.stat_min > self.stat_max {
            return Err(RulesError::ConfigValue(format!(
                "stat_min ({}) exceeds stat_max ({})",
                self.stat_min, self.stat_max
            )));
        }
        if self.hp_damage_from_infection < 0 {
            return Err(RulesError::ConfigValue(format!(
                "hp_damage_from_infection must not be negative, got {}",
                self.hp_damage_from_infection
            )));
        }
        Ok(())
    }
}

/// Meter deltas charged for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionCost {
    pub hunger: i32,
    pub thirst: i32,
    pub infection_risk: i32,
}

impl ActionCost {
    /// Non-zero deltas in application order: hunger, thirst, infection risk.
    pub fn deltas(&self) -> impl Iterator<Item = (SurvivalStat, i32)> {
        [
            (SurvivalStat::Hunger, self.hunger),
            (SurvivalStat::Thirst, self.thirst),
            (SurvivalStat::InfectionRisk, self.infection_risk),
        ]
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cost_table() {
        let config = SurvivalConfig::default();

        for action in ["move", "attack", "flee", "craft"] {
            let cost = config.cost_of(action).unwrap();
            assert_eq!(cost.hunger, 1);
            assert_eq!(cost.thirst, 1);
            assert_eq!(cost.infection_risk, 0);
        }
        assert!(config.cost_of("look").is_none());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = RulesConfig::from_toml_str("").unwrap();
        assert_eq!(config, RulesConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = RulesConfig::from_toml_str(
            r#"
            [survival]
            infection_risk_threshold = 70

            [survival.action_costs.swim]
            thirst = -5
            infection_risk = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.survival.infection_risk_threshold, 70);
        assert_eq!(config.survival.stat_max, STAT_MAX);
        let swim = config.survival.cost_of("swim").unwrap();
        let deltas: Vec<_> = swim.deltas().collect();
        assert_eq!(
            deltas,
            vec![(SurvivalStat::Thirst, -5), (SurvivalStat::InfectionRisk, 3)]
        );
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let result = RulesConfig::from_toml_str("[survival]\nstat_min = 50\nstat_max = 10\n");
        assert!(matches!(result, Err(RulesError::ConfigValue(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = RulesConfig::from_toml_str("[survival\n");
        assert!(matches!(result, Err(RulesError::ConfigParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RulesConfig::load("/nonexistent/ashfall-rules.toml");
        assert!(matches!(result, Err(RulesError::ConfigIo { .. })));
    }
}
