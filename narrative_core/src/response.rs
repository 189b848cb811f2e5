//! The structured reply contract of the narrative backend.
//!
//! Backends rarely return clean JSON. [`extract_json`] tries, in order: the
//! whole text, the first fenced code block, then the first balanced
//! `{...}` object. Each candidate is retried once with trailing commas
//! removed. [`parse_response`] then validates the mandatory fields.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::ResponseError;

// Narration that only restates the action instead of narrating it.
static ECHO_EN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"You performed the \w+ action: \w+").expect("valid regex"));
static ECHO_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action \w+ performed: \w+").expect("valid regex"));
static ECHO_PT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Você realizou a ação \w+: \w+").expect("valid regex"));

/// A skill or attribute check the backend proposes instead of deciding
/// the outcome itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedRoll {
    pub description: String,
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    pub dc: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A newly discovered place proposed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedLocationData {
    #[serde(alias = "new_location_name")]
    pub name: String,
    #[serde(rename = "type", alias = "new_location_type", default)]
    pub kind: String,
    #[serde(alias = "new_location_description", default)]
    pub description: String,
    #[serde(default)]
    pub points_of_interest: Vec<String>,
    /// Direction or exit label -> destination name.
    #[serde(alias = "potential_connections", default)]
    pub connections: BTreeMap<String, String>,
    #[serde(alias = "npcs_suggestions", default)]
    pub npcs: Vec<String>,
    #[serde(alias = "events_suggestions", default)]
    pub events: Vec<String>,
}

/// What a `talk` reply says the addressed NPC discussed this turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationUpdate {
    pub npc: String,
    pub topics: Vec<String>,
    pub shared_info: Vec<String>,
    pub trust_change: i32,
}

/// Wire shape: every field optional so that missing mandatory fields are
/// reported by name rather than as a generic serde error.
#[derive(Debug, Deserialize)]
struct RawResponse {
    success: Option<bool>,
    message: Option<String>,
    current_detailed_location: Option<String>,
    scene_description_update: Option<String>,
    interpreted_action_type: Option<String>,
    interpreted_action_details: Option<Map<String, Value>>,
    suggested_roll: Option<SuggestedRoll>,
    suggested_location_data: Option<SuggestedLocationData>,
    interactable_elements: Option<Vec<String>>,
    new_facts: Option<Map<String, Value>>,
    error: Option<String>,
}

/// A validated backend reply (or a fallback substitute of the same shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeResponse {
    pub success: bool,
    pub message: String,
    pub current_detailed_location: String,
    pub scene_description_update: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_action_details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_roll: Option<SuggestedRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_location_data: Option<SuggestedLocationData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactable_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub new_facts: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NarrativeResponse {
    /// A successful narration with only the mandatory fields.
    pub fn narration(
        message: impl Into<String>,
        location: impl Into<String>,
        scene: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            current_detailed_location: location.into(),
            scene_description_update: scene.into(),
            interpreted_action_type: None,
            interpreted_action_details: None,
            suggested_roll: None,
            suggested_location_data: None,
            interactable_elements: Vec::new(),
            new_facts: Map::new(),
            error: None,
        }
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.interpreted_action_type = Some(action_type.into());
        self
    }

    pub fn with_interactables(mut self, elements: &[&str]) -> Self {
        self.interactable_elements = elements.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Conversation details of a `talk` reply that names its `target_npc`.
    /// Fields of the wrong type are ignored.
    pub fn conversation_update(&self) -> Option<ConversationUpdate> {
        if self.interpreted_action_type.as_deref() != Some("talk") {
            return None;
        }
        let details = self.interpreted_action_details.as_ref()?;
        let npc = details.get("target_npc")?.as_str()?.trim();
        if npc.is_empty() {
            return None;
        }
        let strings = |key: &str| -> Vec<String> {
            details
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        let trust_change = details
            .get("trust_change")
            .and_then(Value::as_i64)
            .map(|delta| delta.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .unwrap_or(0);

        Some(ConversationUpdate {
            npc: npc.to_string(),
            topics: strings("topics"),
            shared_info: strings("shared_info"),
            trust_change,
        })
    }

    /// Validate an already-extracted JSON value against the contract.
    pub fn from_value(value: Value) -> Result<Self, ResponseError> {
        let raw: RawResponse = serde_json::from_value(value)?;
        let success = raw.success.ok_or(ResponseError::MissingField("success"))?;

        if success {
            match raw.message.as_deref() {
                Some(m) if !m.trim().is_empty() => {}
                _ => return Err(ResponseError::MissingField("message")),
            }
            if raw.current_detailed_location.is_none() {
                return Err(ResponseError::MissingField("current_detailed_location"));
            }
            if raw.scene_description_update.is_none() {
                return Err(ResponseError::MissingField("scene_description_update"));
            }
        }

        let message = raw.message.unwrap_or_default();
        if is_echo(&message) {
            return Err(ResponseError::EchoedAction);
        }

        Ok(Self {
            success,
            message,
            current_detailed_location: raw.current_detailed_location.unwrap_or_default(),
            scene_description_update: raw.scene_description_update.unwrap_or_default(),
            interpreted_action_type: raw.interpreted_action_type,
            interpreted_action_details: raw.interpreted_action_details,
            suggested_roll: raw.suggested_roll,
            suggested_location_data: raw.suggested_location_data,
            interactable_elements: raw.interactable_elements.unwrap_or_default(),
            new_facts: raw.new_facts.unwrap_or_default(),
            error: raw.error,
        })
    }
}

/// Extract and validate a reply from raw backend text.
pub fn parse_response(raw: &str) -> Result<NarrativeResponse, ResponseError> {
    let value = extract_json(raw).ok_or(ResponseError::NotStructured)?;
    NarrativeResponse::from_value(value)
}

fn is_echo(message: &str) -> bool {
    [&*ECHO_EN_RE, &*ECHO_SHORT_RE, &*ECHO_PT_RE]
        .iter()
        .any(|re| re.is_match(message))
}

/// Find the first JSON object in `text`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    parse_object(trimmed)
        .or_else(|| extract_fenced_block(trimmed).and_then(parse_object))
        .or_else(|| balanced_objects(trimmed).find_map(parse_object))
}

/// Parse `candidate` as a JSON object, retrying once without trailing commas.
fn parse_object(candidate: &str) -> Option<Value> {
    let as_object = |s: &str| {
        serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_object)
    };
    as_object(candidate).or_else(|| as_object(&strip_trailing_commas(candidate)))
}

/// Body of the first ```json block, or of the first plain ``` block.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```json").or_else(|| text.find("```"))?;
    let after_fence = text.get(open..)?;
    let body_start = after_fence.find('\n')? + 1;
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Candidate `{...}` spans, one per opening brace, matched with awareness
/// of string literals and escapes.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| {
            let mut depth = 0usize;
            let mut in_string = false;
            let mut escaped = false;
            for (offset, c) in text.get(start..)?.char_indices() {
                if in_string {
                    match c {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => in_string = false,
                        _ => {}
                    }
                    continue;
                }
                match c {
                    '"' => in_string = true,
                    '{' => depth += 1,
                    '}' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return text.get(start..start + offset + 1);
                        }
                    }
                    _ => {}
                }
            }
            None
        })
}

/// Remove commas directly before `}` or `]`, outside string literals.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
