//! Configuration for context assembly, loadable from TOML.

use game_rules::STAT_MAX;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::NarrativeError;

/// Knobs for [`crate::ActionContextBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// How many trailing history entries are sent verbatim.
    pub history_window: usize,

    /// Language every narrated field must be written in.
    pub response_language: String,

    /// One-line description of the world and its tone.
    pub setting: String,

    /// Lower-case openers that mark an utterance as a question even
    /// without a `?`.
    pub question_openers: Vec<String>,

    /// Upper bound of the survival meters, used to place hunger and thirst
    /// in their tiers. Must match the rules' `stat_max`.
    pub stat_max: i32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            response_language: "English".to_string(),
            setting: "a post-apocalyptic survival RPG in the aftermath of a zombie outbreak, \
                      where supplies are scarce, trust is rare, and noise can get you killed"
                .to_string(),
            question_openers: [
                "who", "what", "where", "when", "why", "how", "which", "is there", "are there",
                "do you", "does", "can you", "could you", "will", "should",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            stat_max: STAT_MAX,
        }
    }
}

impl ContextConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, NarrativeError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NarrativeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| NarrativeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.history_window, 10);
        assert_eq!(config.stat_max, STAT_MAX);
        assert!(config.question_openers.iter().any(|o| o == "why"));
    }

    #[test]
    fn test_partial_toml() {
        let config = ContextConfig::from_toml_str(
            "history_window = 4\nresponse_language = \"Brazilian Portuguese (pt-BR)\"\n",
        )
        .unwrap();
        assert_eq!(config.history_window, 4);
        assert_eq!(config.response_language, "Brazilian Portuguese (pt-BR)");
        assert_eq!(config.setting, ContextConfig::default().setting);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            ContextConfig::from_toml_str("history_window = \"ten\""),
            Err(NarrativeError::ConfigParse(_))
        ));
    }
}
