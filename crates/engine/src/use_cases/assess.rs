//! Background conversation assessment.
//!
//! Runs off the turn path. Results are cached per room and read by the next
//! turn's orchestration; failures degrade to word-count heuristics.

use std::sync::Arc;

use salon_domain::{
    ConversationStageAssessment, Momentum, Priority, ResponseDepth, ResponseModulation, Room,
    RoomId, SuggestedDepth, TargetLength, UserState,
};

use crate::infrastructure::ports::{
    CachedAssessment, ClockPort, GenerateRequest, LlmPort, RoomStore,
};
use crate::prompts::{build_modulation_prompt, build_stage_prompt};
use crate::schemas::{conversation_stage_schema, response_modulation_schema};

pub struct AssessConversation {
    llm: Arc<dyn LlmPort>,
    store: Arc<dyn RoomStore>,
    clock: Arc<dyn ClockPort>,
    assessment_message_window: usize,
}

impl AssessConversation {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        store: Arc<dyn RoomStore>,
        clock: Arc<dyn ClockPort>,
        assessment_message_window: usize,
    ) -> Self {
        Self {
            llm,
            store,
            clock,
            assessment_message_window,
        }
    }

    /// Never fails: any model problem degrades to the word-count heuristic.
    pub async fn assess_stage(
        &self,
        room: &Room,
        latest_user_message: &str,
    ) -> ConversationStageAssessment {
        let prompt = build_stage_prompt(room, latest_user_message, self.assessment_message_window);
        let request = GenerateRequest::structured(prompt, conversation_stage_schema());

        match self.llm.generate(request).await {
            Ok(value) => match serde_json::from_value(value) {
                Ok(stage) => stage,
                Err(e) => {
                    tracing::warn!(error = %e, "stage assessment malformed, using heuristic");
                    stage_heuristic(latest_user_message)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "stage assessment failed, using heuristic");
                stage_heuristic(latest_user_message)
            }
        }
    }

    /// Never fails: any model problem degrades to the word-count heuristic.
    pub async fn assess_modulation(&self, user_message: &str, room: &Room) -> ResponseModulation {
        let prompt = build_modulation_prompt(user_message, room);
        let request = GenerateRequest::structured(prompt, response_modulation_schema());

        match self.llm.generate(request).await {
            Ok(value) => match serde_json::from_value::<ResponseModulation>(value) {
                Ok(modulation) => modulation.clamped(),
                Err(e) => {
                    tracing::warn!(error = %e, "modulation assessment malformed, using heuristic");
                    modulation_heuristic(user_message, room.participants.len())
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "modulation assessment failed, using heuristic");
                modulation_heuristic(user_message, room.participants.len())
            }
        }
    }

    /// Run both assessments concurrently in a detached task and cache the
    /// result. The turn never waits for or learns about the outcome.
    pub fn spawn_background(self: Arc<Self>, room_id: RoomId, user_message: String, room: Room) {
        tokio::spawn(async move {
            let (stage, modulation) = tokio::join!(
                self.assess_stage(&room, &user_message),
                self.assess_modulation(&user_message, &room),
            );

            let cached = CachedAssessment {
                stage: Some(stage),
                modulation: Some(modulation),
                updated_at: Some(self.clock.now()),
            };
            if let Err(e) = self.store.cache_assessment(room_id, &cached).await {
                tracing::warn!(room_id = %room_id, error = %e, "failed to cache assessment");
            }
        });
    }
}

fn word_count(message: &str) -> usize {
    message.split_whitespace().count()
}

fn stage_heuristic(message: &str) -> ConversationStageAssessment {
    let words = word_count(message);
    ConversationStageAssessment {
        user_state: if words > 30 {
            UserState::Engaged
        } else if words > 10 {
            UserState::Exploring
        } else {
            UserState::Casual
        },
        momentum: Momentum::Sustained,
        suggested_depth: SuggestedDepth::Moderate,
    }
}

fn modulation_heuristic(message: &str, participant_count: usize) -> ResponseModulation {
    let words = word_count(message);
    ResponseModulation {
        target_length: if words > 30 {
            TargetLength::Full
        } else if words > 10 {
            TargetLength::Moderate
        } else {
            TargetLength::Brief
        },
        depth: if words > 20 {
            ResponseDepth::Accessible
        } else {
            ResponseDepth::Surface
        },
        max_characters: if words > 30 {
            3.min(participant_count.max(1)) as u8
        } else {
            1
        },
        priority: Priority::Clarity,
    }
    .clamped()
}
