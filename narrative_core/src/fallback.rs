//! Offline replies used when the narrative backend fails.
//!
//! Classification is a keyword scan over the raw action text; each category
//! maps to one canned reply. This path has no failure modes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::keywords::{self, KeywordRule};
use crate::response::NarrativeResponse;

/// Location label carried by every fallback reply. Never written into state.
pub const FALLBACK_LOCATION: &str = "Somewhere in the ruins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTypeCategory {
    Move,
    Combat,
    Talk,
    Search,
    UseItem,
    Default,
}

impl PromptTypeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTypeCategory::Move => "move",
            PromptTypeCategory::Combat => "combat",
            PromptTypeCategory::Talk => "talk",
            PromptTypeCategory::Search => "search",
            PromptTypeCategory::UseItem => "use_item",
            PromptTypeCategory::Default => "default",
        }
    }
}

impl std::fmt::Display for PromptTypeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tested top to bottom; the first match wins.
pub const FALLBACK_RULES: &[KeywordRule<PromptTypeCategory>] = &[
    KeywordRule::new(
        PromptTypeCategory::Move,
        &["move", "go to", "travel", "walk", "enter"],
    ),
    KeywordRule::new(
        PromptTypeCategory::Combat,
        &["combat", "attack", "fight", "battle", "enemy"],
    ),
    KeywordRule::new(
        PromptTypeCategory::Talk,
        &["talk", "speak", "conversation", "dialogue"],
    ),
    KeywordRule::new(
        PromptTypeCategory::Search,
        &["search", "look", "examine", "investigate"],
    ),
    KeywordRule::new(
        PromptTypeCategory::UseItem,
        &["use", "item", "potion", "scroll", "equip"],
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackClassifier;

impl FallbackClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> PromptTypeCategory {
        keywords::classify(FALLBACK_RULES, text).unwrap_or(PromptTypeCategory::Default)
    }

    /// Canned reply for `text`, with a diagnostic record.
    pub fn respond(&self, text: &str) -> NarrativeResponse {
        let category = self.classify(text);
        warn!(
            category = %category,
            input_len = text.len(),
            timestamp = %Utc::now().to_rfc3339(),
            "narrative fallback triggered"
        );
        canned_reply(category)
    }
}

/// The fixed reply for a category.
pub fn canned_reply(category: PromptTypeCategory) -> NarrativeResponse {
    let (message, scene, action_type, interactables): (&str, &str, &str, &[&str]) = match category {
        PromptTypeCategory::Move => (
            "You pick your way along a cracked road between burned-out cars.",
            "A debris-strewn road under a grey sky. Wind rattles loose sheet metal.",
            "move_fallback",
            &["Overturned Bus", "Side Alley"],
        ),
        PromptTypeCategory::Combat => (
            "A shape lurches out of the shadows. Get ready!",
            "The air is tense; something hostile is close.",
            "combat_fallback_start",
            &[],
        ),
        PromptTypeCategory::Talk => (
            "\"Not now,\" a survivor mutters, eyes on the door. \"Keep your voice down.\"",
            "A wary survivor keeps their distance.",
            "talk_fallback",
            &[],
        ),
        PromptTypeCategory::Search => (
            "You comb through the area but find nothing useful right now.",
            "Scattered debris, already picked over.",
            "search_fallback",
            &["Debris Pile", "Broken Cabinet"],
        ),
        PromptTypeCategory::UseItem => (
            "You fumble with it, but nothing comes of it for now.",
            "Nothing around you seems to change.",
            "use_item_fallback",
            &[],
        ),
        PromptTypeCategory::Default => (
            "The world holds its breath. Nothing seems to happen for now.",
            "Silence settles over the ruins.",
            "default_fallback",
            &[],
        ),
    };

    NarrativeResponse::narration(message, FALLBACK_LOCATION, scene)
        .with_action_type(action_type)
        .with_interactables(interactables)
}
