//! Narrative rule library.
//!
//! Each function returns one self-contained text fragment. The builder
//! decides which fragments apply to a turn and concatenates them.

use game_rules::{Npc, NpcMemory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::ContextConfig;

/// Player intents the backend may classify a free-form action into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Look,
    Talk,
    VocalAction,
    Search,
    UseItem,
    Attack,
    Flee,
    Rest,
    Skill,
    Craft,
    Move,
    CustomComplex,
}

impl Intent {
    /// Intents offered to the backend when it must interpret free text.
    pub const INTERPRETABLE: [Intent; 11] = [
        Intent::Look,
        Intent::Talk,
        Intent::VocalAction,
        Intent::Search,
        Intent::UseItem,
        Intent::Attack,
        Intent::Flee,
        Intent::Rest,
        Intent::Skill,
        Intent::Craft,
        Intent::CustomComplex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Look => "look",
            Intent::Talk => "talk",
            Intent::VocalAction => "vocal_action",
            Intent::Search => "search",
            Intent::UseItem => "use_item",
            Intent::Attack => "attack",
            Intent::Flee => "flee",
            Intent::Rest => "rest",
            Intent::Skill => "skill",
            Intent::Craft => "craft",
            Intent::Move => "move",
            Intent::CustomComplex => "custom_complex",
        }
    }

    /// Parse a direct action name. Unknown names have no dedicated rules.
    pub fn from_action(name: &str) -> Option<Intent> {
        let name = name.trim().to_lowercase();
        Intent::INTERPRETABLE
            .into_iter()
            .chain(std::iter::once(Intent::Move))
            .find(|intent| intent.as_str() == name)
    }

    /// Static narrative template for intents without dynamic parts.
    pub fn template(&self) -> Option<&'static str> {
        let text = match self {
            Intent::Look => {
                "INTENT 'look': If the player names a target, describe that target in detail: \
                 what it looks like, clues it offers, anything relevant. For a general look \
                 around, refresh the scene description with what has changed."
            }
            Intent::Search => {
                "INTENT 'search': Describe what the character finds or fails to find, based on \
                 the place and the details of the search. Findings may be useful, useless, \
                 dangerous, or clues about what happened here."
            }
            Intent::UseItem => {
                "INTENT 'use_item': Describe the result of using the named item. A consumable \
                 has a felt effect; a tool succeeds or fails at its task; a quest item reveals \
                 information or a consequence. The item must be one the character carries."
            }
            Intent::Attack => {
                "INTENT 'attack': Without an active fight, describe the character readying \
                 themselves and striking the named (or most obvious) target, opening a \
                 confrontation. With an active fight, narrate the outcome against the current enemy."
            }
            Intent::Flee => {
                "INTENT 'flee': Describe the escape attempt. Say whether it works, what \
                 obstacles or dangers appear, and whether the character ends up somewhere \
                 better or worse. Keep the tension of the outbreak."
            }
            Intent::Rest => {
                "INTENT 'rest': Describe the attempt to rest. Judge whether the spot is safe \
                 enough, whether the character is interrupted, and what recovery (or lack of it) \
                 follows."
            }
            Intent::Skill => {
                "INTENT 'skill': Describe the character applying the skill to the situation. \
                 If the attempt is risky and not trivially resolved, describe only its start \
                 and propose a suggested_roll instead of deciding the result."
            }
            Intent::Craft => {
                "INTENT 'craft': Describe the character assembling something from what they \
                 carry or find nearby. Missing materials or tools must block or weaken the \
                 result; crafting takes time and may make noise."
            }
            Intent::Move => {
                "INTENT 'move': Describe the transition or the attempt to move. A known place \
                 gets fresh details; an unknown or blocked route gets the obstacle that stops it."
            }
            Intent::CustomComplex => {
                "INTENT 'custom_complex' or anything not listed: Interpret the action within \
                 the outbreak setting and describe a coherent result, considering likely \
                 successes, failures and consequences."
            }
            Intent::Talk | Intent::VocalAction => return None,
        };
        Some(text)
    }
}

/// True if `text` reads as a question: it contains `?` or starts with one
/// of the configured openers.
pub fn is_question(text: &str, openers: &[String]) -> bool {
    let lowered = text.trim().to_lowercase();
    if lowered.contains('?') {
        return true;
    }
    openers.iter().any(|opener| {
        lowered
            .strip_prefix(opener.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| !c.is_alphanumeric()))
    })
}

/// Rules for dialogue. A question must be answered by the NPC best placed
/// to know; a statement gets an in-character reaction.
pub fn talk_guideline(
    utterance: &str,
    question: bool,
    npcs: &[(&Npc, Option<&NpcMemory>)],
) -> String {
    let mut out = String::from("INTENT 'talk':\n");
    if question {
        out.push_str(
            "  The player is asking a question. The NPC whose knowledge fits best answers it.\n\
             \x20 - The reply MUST attempt to answer. Never echo the question back to the player \
             or have NPCs ask it among themselves.\n\
             \x20 - If nobody present can know, say so through a shrug, a refusal or an honest \
             \"I don't know\".\n\
             \x20 - A question addressed to a named NPC is answered primarily by that NPC.\n",
        );
    } else {
        out.push_str(
            "  The player is making a statement or opening a conversation.\n\
             \x20 - The NPC reacts in character: mood, fear, distrust or hope as fits the outbreak.\n\
             \x20 - Reveal something about the world, a danger, a rumor, a need or a possible trade.\n\
             \x20 - Leave the player a meaningful choice about how to continue.\n",
        );
    }
    out.push_str(
        "  Never repeat verbatim what the same NPC said in the recent history. If the \
         player asks again, go deeper or give new information.\n",
    );
    if !utterance.trim().is_empty() {
        out.push_str(&format!("  Player's words: \"{}\"\n", utterance.trim()));
    }
    for (npc, memory) in npcs {
        out.push_str(&npc_profile(npc, *memory));
    }
    out
}

/// Rules for shouting, whispering and other vocal actions that are not
/// addressed to anyone.
pub fn vocal_action_guideline(noise_rule_number: usize) -> String {
    format!(
        "INTENT 'vocal_action':\n\
         \x20 - Respect the intensity the player describes. A scream IS loud; a whisper IS quiet. \
         Do not muffle or amplify it unless the surroundings clearly would.\n\
         \x20 - Describe the immediate physical effect on the surroundings.\n\
         \x20 - Then apply general rule {noise_rule_number} (noise consequences): NPC reactions \
         must reflect the danger of drawing the dead or hostile survivors.\n\
         \x20 - Focus on the tension created, not on starting a new conversation.\n"
    )
}

/// One-line scene entry for an NPC: who they are and what they know.
pub fn npc_summary(npc: &Npc) -> String {
    let mut out = format!(
        "- {} ({} {}, {}, {} toward the player)",
        npc.name,
        npc.race,
        npc.profession,
        npc.personality,
        npc.attitude()
    );
    if !npc.knowledge.is_empty() {
        out.push_str(&format!("; knows about {}", npc.knowledge.join(", ")));
    }
    out.push('\n');
    out
}

/// Profile block for one NPC, with what they already told the player.
pub fn npc_profile(npc: &Npc, memory: Option<&NpcMemory>) -> String {
    let mut out = format!(
        "  About {}: {} {}, personality {}, currently {} and {} toward the player.\n",
        npc.name,
        npc.race,
        npc.profession,
        npc.personality,
        npc.mood,
        npc.attitude()
    );
    if !npc.knowledge.is_empty() {
        out.push_str(&format!("    Knows about: {}\n", npc.knowledge.join(", ")));
    }
    let Some(memory) = memory.filter(|m| !m.is_empty()) else {
        return out;
    };
    let join = |items: &BTreeSet<String>| {
        if items.is_empty() {
            "nothing yet".to_string()
        } else {
            items.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    out.push_str(&format!(
        "    Already discussed: {}\n    Already told the player: {}\n    \
         Trust in the player (-100 to 100): {}\n",
        join(&memory.topics),
        join(&memory.shared_info),
        memory.trust
    ));
    out
}

/// Rules applied to every turn. Order matters: other fragments refer to
/// rules by their 1-based number.
pub const GENERAL_RULES: &[&str] = &[
    "FOCUS ON THE ACTION: center the reply on the direct result and immediate consequences of the player's action.",
    "USE THE HISTORY: rely on the recent history to resolve ambiguous actions such as 'fix it' or 'look closer'.",
    "MOVE THE STORY: actions have impact. Wounded enemies stay wounded; nothing resets by itself.",
    "NO ATMOSPHERIC REPETITION: do not restate smells, light or air unless they changed.",
    "CONSISTENCY: stay true to the location, the NPCs present and the character's condition tiers. NPCs use tools and knowledge fitting their profession.",
    "SPECIFICITY: say exactly what is or is not found, seen or achieved.",
    "ONLY WHAT WAS REFERENCED: do not pull in elements from earlier descriptions the player did not touch this turn.",
    "VAGUE OR OFF-CHARACTER INPUT: if the action makes no sense in the world, narrate brief confusion or silence from the surroundings instead of inventing intent.",
    "NPC INVOLVEMENT: NPCs react only when the action affects them or a reaction would be natural and immediate.",
    "NOISE CONSEQUENCES: loud sounds (shouts, gunshots, engines, breaking glass) attract the dead and hostile survivors. Narration and NPC reactions must reflect that danger.",
    "SUGGESTED ROLLS: when the attempt involves real risk or a contested challenge, add a `suggested_roll` (description, attribute, optional skill, dc, optional reasoning; DC easy 10-12, medium 13-15, hard 16-18, very hard 19+). The `message` then describes only the start of the attempt, never its outcome. Never suggest rolls for trivial actions.",
    "INTERACTABLE ELEMENTS: for the current detailed location, name 2 to 4 short key objects or spots the player can act on next in `interactable_elements`.",
];

/// 1-based number of the noise rule in [`GENERAL_RULES`].
pub const NOISE_RULE_NUMBER: usize = 10;

pub fn general_rules() -> String {
    let mut out = String::from("GENERAL RULES (always apply):\n");
    for (i, rule) in GENERAL_RULES.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, rule));
    }
    out
}

/// The response contract. Always the last fragment of a context.
pub fn response_format(language: &str) -> String {
    format!(
        "RESPONSE FORMAT:\n\
         Reply ONLY with one valid JSON object, no prose around it.\n\
         Mandatory fields:\n\
         - `success` (boolean): true whenever you can narrate; false only on an internal failure.\n\
         - `message` (string): the main narration of the action's result, in {language}.\n\
         - `current_detailed_location` (string): detailed name of the current place including the sub-area, e.g. \"Underground Shelter - Main Hall\".\n\
         - `scene_description_update` (string): a concise description of that sub-area, in {language}.\n\
         Optional fields:\n\
         - `interpreted_action_type` (string): the intent you classified the action as.\n\
         - `interpreted_action_details` (object): parameters of that intent, e.g. {{\"target_npc\": \"Field Medic\"}}. \
         For `talk`, also `topics` and `shared_info` (lists of short strings covering what the NPC discussed and revealed) and `trust_change` (integer, -10 to 10).\n\
         - `suggested_roll` (object): `description`, `attribute`, optional `skill`, `dc` (integer), optional `reasoning`.\n\
         - `interactable_elements` (list of strings): 2 to 4 short labels.\n\
         - `new_facts` (object): flat key/value facts worth remembering long term.\n\
         - `suggested_location_data` (object): for a newly discovered place, its `name`, `type`, `description`, `points_of_interest`, `connections`, `npcs`, `events`.\n\
         - `error` (string): only when `success` is false.\n"
    )
}

/// The fixed system instruction: persona, language and tone.
pub fn system_instruction(config: &ContextConfig) -> String {
    format!(
        "You are the Game Master of {setting}.\n\
         Rules:\n\
         1. Always answer in {language}.\n\
         2. Keep a narrative, immersive tone: danger, scarcity and distrust, with rare glimpses of hope.\n\
         3. Never repeat earlier lines or descriptions word for word.\n\
         4. If the player asks the same thing again, go deeper or give new information.\n\
         5. Stay coherent with the recent history and with the character's condition.\n\
         6. NPCs act logically for their profession and for people trying to survive.\n\
         7. Never invent mechanical results the game has already computed; narrate the ones you are given.",
        setting = config.setting,
        language = config.response_language,
    )
}
