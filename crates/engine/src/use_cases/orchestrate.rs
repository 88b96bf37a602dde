//! Turn orchestration: decide which personas respond and in what order.
//!
//! The selection policy lives entirely in the prompt; this code only
//! validates the returned plan and degrades to a single-responder fallback.

use std::sync::Arc;

use salon_domain::{OrchestrationPlan, PlanEntry, ResponseTiming, Room};

use crate::infrastructure::ports::{CachedAssessment, GenerateRequest, LlmError, LlmPort};
use crate::prompts::{build_orchestrator_prompt, Locale};
use crate::schemas::orchestration_schema;

pub struct OrchestrateTurn {
    llm: Arc<dyn LlmPort>,
    recent_message_window: usize,
}

impl OrchestrateTurn {
    pub fn new(llm: Arc<dyn LlmPort>, recent_message_window: usize) -> Self {
        Self {
            llm,
            recent_message_window,
        }
    }

    pub async fn execute(
        &self,
        user_message: &str,
        room: &Room,
        cached: Option<&CachedAssessment>,
        locale: Locale,
    ) -> Result<OrchestrationPlan, LlmError> {
        let prompt = build_orchestrator_prompt(
            user_message,
            room,
            cached,
            self.recent_message_window,
            locale,
        );
        let request = GenerateRequest::structured(prompt, orchestration_schema());

        let plan = match self.llm.generate(request).await {
            Ok(value) => match serde_json::from_value::<OrchestrationPlan>(value) {
                Ok(plan) => validate_plan(plan, room)?,
                Err(e) => {
                    tracing::warn!(error = %e, "orchestration response malformed, using fallback");
                    fallback_plan(room)?
                }
            },
            Err(e @ LlmError::ModelNotFound(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "orchestration failed, using fallback");
                fallback_plan(room)?
            }
        };

        tracing::debug!(
            entries = plan.plan.len(),
            continue_without_user = plan.continue_without_user,
            "turn plan ready"
        );
        Ok(plan)
    }
}

/// Drop entries without a usable `who`; an entirely unusable plan degrades to
/// the fallback.
fn validate_plan(mut plan: OrchestrationPlan, room: &Room) -> Result<OrchestrationPlan, LlmError> {
    let before = plan.plan.len();
    plan.plan.retain(|entry| {
        let keep = !entry.who.trim().is_empty();
        if !keep {
            tracing::warn!("plan entry without a speaker skipped");
        }
        keep
    });
    if plan.plan.is_empty() && before > 0 {
        tracing::warn!("all plan entries were invalid, using fallback");
        return fallback_plan(room);
    }
    if plan.plan.is_empty() {
        return fallback_plan(room);
    }
    Ok(plan)
}

/// Single-responder fallback naming the room's first participant. A room
/// without participants cannot be planned for.
fn fallback_plan(room: &Room) -> Result<OrchestrationPlan, LlmError> {
    let first = room
        .first_participant()
        .ok_or_else(|| LlmError::Validation("room has no participants".to_string()))?;

    Ok(OrchestrationPlan {
        interpretation: "User wants to continue the conversation".to_string(),
        plan: vec![PlanEntry {
            who: first.name.clone(),
            why: "Continuing the conversation naturally".to_string(),
            when: ResponseTiming::Immediate,
            likelihood: "Will respond".to_string(),
        }],
        expected_dynamic: "Continuing natural conversation".to_string(),
        continue_without_user: false,
        tension_level: "Relaxed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use salon_domain::Participant;

    struct AlwaysFailingLlm(LlmError);

    #[async_trait]
    impl LlmPort for AlwaysFailingLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            Err(self.0.clone())
        }
    }

    struct StaticLlm(serde_json::Value);

    #[async_trait]
    impl LlmPort for StaticLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn sample_room(names: &[&str]) -> Room {
        let participants = names
            .iter()
            .map(|n| Participant::new(*n, "identity", "personality", "curious"))
            .collect();
        Room::new(participants, None, "calm", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn failure_yields_first_participant_fallback() {
        let orchestrate = OrchestrateTurn::new(
            Arc::new(AlwaysFailingLlm(LlmError::Connection("refused".into()))),
            10,
        );
        let room = sample_room(&["Einstein", "Curie"]);

        let plan = orchestrate
            .execute("hello", &room, None, Locale::En)
            .await
            .unwrap();

        assert_eq!(plan.plan.len(), 1);
        assert_eq!(plan.plan[0].who, "Einstein");
        assert_eq!(plan.plan[0].when, ResponseTiming::Immediate);
        assert!(!plan.continue_without_user);
    }

    #[tokio::test]
    async fn failure_with_empty_room_propagates() {
        let orchestrate = OrchestrateTurn::new(
            Arc::new(AlwaysFailingLlm(LlmError::Timeout("slow".into()))),
            10,
        );
        let room = sample_room(&[]);

        let err = orchestrate
            .execute("hello", &room, None, Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn model_not_found_propagates() {
        let orchestrate = OrchestrateTurn::new(
            Arc::new(AlwaysFailingLlm(LlmError::ModelNotFound("m".into()))),
            10,
        );
        let room = sample_room(&["Einstein"]);

        let err = orchestrate
            .execute("hello", &room, None, Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn entries_without_speaker_are_skipped() {
        let orchestrate = OrchestrateTurn::new(
            Arc::new(StaticLlm(serde_json::json!({
                "interpretation": "debate",
                "plan": [
                    { "who": "", "why": "?", "when": "immediate", "likelihood": "high" },
                    { "who": "Curie", "why": "addressed", "when": "immediate", "likelihood": "high" }
                ],
                "expectedDynamic": "focused reply",
                "continueWithoutUser": false,
                "tensionLevel": "calm"
            }))),
            10,
        );
        let room = sample_room(&["Einstein", "Curie"]);

        let plan = orchestrate
            .execute("Curie, what do you think?", &room, None, Locale::En)
            .await
            .unwrap();

        assert_eq!(plan.plan.len(), 1);
        assert_eq!(plan.plan[0].who, "Curie");
    }

    #[tokio::test]
    async fn fully_invalid_plan_degrades_to_fallback() {
        let orchestrate = OrchestrateTurn::new(
            Arc::new(StaticLlm(serde_json::json!({
                "interpretation": "??",
                "plan": [{ "who": "  ", "why": "", "when": "immediate", "likelihood": "" }],
                "expectedDynamic": "",
                "continueWithoutUser": true,
                "tensionLevel": ""
            }))),
            10,
        );
        let room = sample_room(&["Einstein", "Curie"]);

        let plan = orchestrate
            .execute("hello", &room, None, Locale::En)
            .await
            .unwrap();
        assert_eq!(plan.plan[0].who, "Einstein");
        assert!(!plan.continue_without_user);
    }
}
