//! Structured model outputs.
//!
//! Deserialization targets for the JSON the model is asked to produce.
//! Field names mirror the camelCase keys of the output schemas; every
//! optional field defaults so a sloppy model response still parses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One persona as described by the setup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub current_state: String,
}

/// Result of instantiating personas from free-text user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub participants: Vec<PersonaProfile>,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub atmosphere: String,
    #[serde(default)]
    pub suggested_opening: Option<String>,
}

/// When a planned response should be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTiming {
    #[default]
    Immediate,
    AfterPrevious,
    Interrupting,
    #[serde(other)]
    Unknown,
}

impl ResponseTiming {
    /// Only immediate and after_previous entries are materialized this turn.
    pub fn executes_now(&self) -> bool {
        matches!(self, ResponseTiming::Immediate | ResponseTiming::AfterPrevious)
    }
}

/// One planned persona response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    #[serde(default)]
    pub who: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub when: ResponseTiming,
    /// Free-text likelihood description, e.g. "will respond".
    #[serde(default)]
    pub likelihood: String,
}

/// The turn plan: who responds to the user's message and in what order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationPlan {
    #[serde(default)]
    pub interpretation: String,
    #[serde(default)]
    pub plan: Vec<PlanEntry>,
    #[serde(default)]
    pub expected_dynamic: String,
    #[serde(default)]
    pub continue_without_user: bool,
    /// Free-text tension description, e.g. "building".
    #[serde(default)]
    pub tension_level: String,
}

/// A single persona's in-character reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterReply {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub speech: String,
    #[serde(default)]
    pub delivery: String,
    #[serde(default)]
    pub internal_state: String,
    #[serde(default)]
    pub subtext: Option<String>,
    #[serde(default)]
    pub triggers_reaction: Option<String>,
    #[serde(default)]
    pub changes_atmosphere: Option<String>,
}

/// One line of a persona-to-persona exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeLine {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub manner: String,
    #[serde(default)]
    pub effect: String,
}

/// An unprompted exchange among personas after the user's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    #[serde(default)]
    pub exchanges: Vec<ExchangeLine>,
    #[serde(default)]
    pub room_shift: String,
    #[serde(default)]
    pub natural_pause: bool,
    #[serde(default)]
    pub suggested_user_prompt: Option<String>,
}

/// Compressed essence of a long conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSummary {
    #[serde(default)]
    pub essence: String,
    #[serde(default)]
    pub character_evolution: HashMap<String, String>,
    #[serde(default)]
    pub unresolved: Vec<String>,
    #[serde(default)]
    pub key_moments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_tolerates_missing_fields() {
        let plan: OrchestrationPlan = serde_json::from_value(json!({
            "plan": [{ "who": "Einstein" }]
        }))
        .unwrap();
        assert_eq!(plan.plan.len(), 1);
        assert_eq!(plan.plan[0].when, ResponseTiming::Immediate);
        assert!(!plan.continue_without_user);
    }

    #[test]
    fn unknown_timing_does_not_execute() {
        let entry: PlanEntry = serde_json::from_value(json!({
            "who": "Curie",
            "when": "later_maybe"
        }))
        .unwrap();
        assert_eq!(entry.when, ResponseTiming::Unknown);
        assert!(!entry.when.executes_now());
        assert!(ResponseTiming::AfterPrevious.executes_now());
        assert!(!ResponseTiming::Interrupting.executes_now());
    }

    #[test]
    fn character_reply_parses_camel_case() {
        let reply: CharacterReply = serde_json::from_value(json!({
            "speaker": "Newton",
            "speech": "Consider the apple.",
            "delivery": "thoughtful",
            "internalState": "focused",
            "changesAtmosphere": "charged with curiosity"
        }))
        .unwrap();
        assert_eq!(reply.internal_state, "focused");
        assert_eq!(reply.changes_atmosphere.as_deref(), Some("charged with curiosity"));
    }

    #[test]
    fn compression_summary_defaults_collections() {
        let summary: CompressionSummary =
            serde_json::from_value(json!({ "essence": "a debate about light" })).unwrap();
        assert!(summary.character_evolution.is_empty());
        assert!(summary.unresolved.is_empty());
    }
}
