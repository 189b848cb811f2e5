//! Qualitative condition tiers.
//!
//! The backend only ever sees these buckets, never the raw numbers behind
//! them.

use serde::{Deserialize, Serialize};

/// `current < max * percent / 100`, computed without overflow or floats.
fn below_percent(current: i32, max: i32, percent: i64) -> bool {
    (current as i64) * 100 < (max as i64) * percent
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthTier {
    Healthy,
    Wounded,
    SeverelyWounded,
    Incapacitated,
}

impl HealthTier {
    /// Below 40% of max is severe, below 75% is wounded. A non-positive
    /// max means the character is out of the fight regardless of current HP.
    pub fn from_hp(current: i32, max: i32) -> Self {
        if max <= 0 {
            HealthTier::Incapacitated
        } else if below_percent(current, max, 40) {
            HealthTier::SeverelyWounded
        } else if below_percent(current, max, 75) {
            HealthTier::Wounded
        } else {
            HealthTier::Healthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthTier::Healthy => "healthy",
            HealthTier::Wounded => "wounded",
            HealthTier::SeverelyWounded => "severely wounded",
            HealthTier::Incapacitated => "incapacitated/dead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HungerTier {
    Fed,
    Hungry,
    Famished,
}

impl HungerTier {
    /// Tier from remaining food reserve out of `max`.
    pub fn from_reserve(reserve: i32, max: i32) -> Self {
        if max <= 0 || below_percent(reserve, max, 25) {
            HungerTier::Famished
        } else if below_percent(reserve, max, 50) {
            HungerTier::Hungry
        } else {
            HungerTier::Fed
        }
    }

    /// Tier from the hunger meter, which counts deprivation upward from 0
    /// to `max`.
    pub fn from_meter(hunger: i32, max: i32) -> Self {
        Self::from_reserve(max.saturating_sub(hunger), max)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HungerTier::Fed => "fed",
            HungerTier::Hungry => "hungry",
            HungerTier::Famished => "famished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThirstTier {
    Hydrated,
    Thirsty,
    Parched,
}

impl ThirstTier {
    /// Tier from remaining water reserve out of `max`.
    pub fn from_reserve(reserve: i32, max: i32) -> Self {
        if max <= 0 || below_percent(reserve, max, 25) {
            ThirstTier::Parched
        } else if below_percent(reserve, max, 50) {
            ThirstTier::Thirsty
        } else {
            ThirstTier::Hydrated
        }
    }

    /// Tier from the thirst meter, which counts deprivation upward from 0
    /// to `max`.
    pub fn from_meter(thirst: i32, max: i32) -> Self {
        Self::from_reserve(max.saturating_sub(thirst), max)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThirstTier::Hydrated => "hydrated",
            ThirstTier::Thirsty => "thirsty",
            ThirstTier::Parched => "parched",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaminaTier {
    Rested,
    Tired,
    Exhausted,
}

impl StaminaTier {
    /// Same cutoffs as the survival meters: below 25% of max is exhausted,
    /// below 50% is tired.
    pub fn from_stamina(current: i32, max: i32) -> Self {
        if max <= 0 || below_percent(current, max, 25) {
            StaminaTier::Exhausted
        } else if below_percent(current, max, 50) {
            StaminaTier::Tired
        } else {
            StaminaTier::Rested
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StaminaTier::Rested => "rested",
            StaminaTier::Tired => "tired",
            StaminaTier::Exhausted => "exhausted",
        }
    }
}
