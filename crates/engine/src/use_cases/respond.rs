//! In-character reply generation for a single persona.

use std::sync::Arc;

use salon_domain::{CharacterReply, Participant, Room};

use crate::infrastructure::ports::{GenerateRequest, LlmError, LlmPort};
use crate::prompts::{build_character_prompt, Locale};
use crate::schemas::character_response_schema;

pub struct GenerateReply {
    llm: Arc<dyn LlmPort>,
}

impl GenerateReply {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Generate a reply for `character`. Recoverable failures become a
    /// generic in-character reply rather than an error.
    pub async fn execute(
        &self,
        character: &Participant,
        user_message: &str,
        room: &Room,
        reason: &str,
        locale: Locale,
    ) -> Result<CharacterReply, LlmError> {
        let prompt = build_character_prompt(character, user_message, room, reason, locale);
        let request = GenerateRequest::structured(prompt, character_response_schema());

        let reply = match self.llm.generate(request).await {
            Ok(value) => match serde_json::from_value::<CharacterReply>(value) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(character = %character.name, error = %e, "reply malformed, using fallback");
                    fallback_reply(character)
                }
            },
            Err(e @ LlmError::ModelNotFound(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(character = %character.name, error = %e, "reply failed, using fallback");
                fallback_reply(character)
            }
        };

        Ok(fill_missing_fields(reply, character))
    }
}

/// A sparse but valid reply always leaves with speaker, speech, delivery and
/// internal state populated.
fn fill_missing_fields(mut reply: CharacterReply, character: &Participant) -> CharacterReply {
    if reply.speaker.trim().is_empty() {
        reply.speaker = character.name.clone();
    }
    if reply.speech.trim().is_empty() {
        reply.speech = format!(
            "That's an interesting point. As {}, I find myself reflecting on what you've shared.",
            character.name
        );
    }
    if reply.delivery.trim().is_empty() {
        reply.delivery = "Speaking thoughtfully".to_string();
    }
    if reply.internal_state.trim().is_empty() {
        reply.internal_state = "Engaged with the conversation".to_string();
    }
    reply
}

fn fallback_reply(character: &Participant) -> CharacterReply {
    CharacterReply {
        speaker: character.name.clone(),
        speech: format!(
            "That's an interesting point. As {}, I find myself reflecting on what you've shared.",
            character.name
        ),
        delivery: "Speaking thoughtfully, maintaining their characteristic demeanor".to_string(),
        internal_state: "Engaged with the conversation and considering how to respond authentically"
            .to_string(),
        subtext: None,
        triggers_reaction: None,
        changes_atmosphere: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticLlm(Result<serde_json::Value, LlmError>);

    #[async_trait]
    impl LlmPort for StaticLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            self.0.clone()
        }
    }

    fn newton_room() -> Room {
        Room::new(
            vec![Participant::new(
                "Newton",
                "Natural philosopher",
                "Precise and proud",
                "contemplative",
            )],
            None,
            "studious calm",
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_speaker_and_speech_are_filled() {
        let generate = GenerateReply::new(Arc::new(StaticLlm(Ok(serde_json::json!({
            "speaker": "",
            "speech": "",
            "delivery": "",
            "internalState": ""
        })))));
        let room = newton_room();
        let newton = room.participant_by_name("Newton").unwrap();

        let reply = generate
            .execute(newton, "what is gravity?", &room, "directly addressed", Locale::En)
            .await
            .unwrap();

        assert_eq!(reply.speaker, "Newton");
        assert!(!reply.speech.is_empty());
        assert!(reply.speech.contains("Newton"));
        assert!(!reply.delivery.is_empty());
        assert!(!reply.internal_state.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_yields_in_character_fallback() {
        let generate = GenerateReply::new(Arc::new(StaticLlm(Err(LlmError::Timeout(
            "slow".into(),
        )))));
        let room = newton_room();
        let newton = room.participant_by_name("Newton").unwrap();

        let reply = generate
            .execute(newton, "hello", &room, "greeting", Locale::En)
            .await
            .unwrap();

        assert_eq!(reply.speaker, "Newton");
        assert!(reply.speech.contains("Newton"));
        assert!(reply.changes_atmosphere.is_none());
    }

    #[tokio::test]
    async fn model_not_found_propagates() {
        let generate = GenerateReply::new(Arc::new(StaticLlm(Err(LlmError::ModelNotFound(
            "m".into(),
        )))));
        let room = newton_room();
        let newton = room.participant_by_name("Newton").unwrap();

        let err = generate
            .execute(newton, "hello", &room, "greeting", Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn well_formed_reply_passes_through() {
        let generate = GenerateReply::new(Arc::new(StaticLlm(Ok(serde_json::json!({
            "speaker": "Newton",
            "speech": "Gravity acts at a distance.",
            "delivery": "firm",
            "internalState": "certain",
            "subtext": "do not question the Principia",
            "changesAtmosphere": "intellectually charged"
        })))));
        let room = newton_room();
        let newton = room.participant_by_name("Newton").unwrap();

        let reply = generate
            .execute(newton, "what is gravity?", &room, "addressed", Locale::En)
            .await
            .unwrap();

        assert_eq!(reply.speech, "Gravity acts at a distance.");
        assert_eq!(reply.subtext.as_deref(), Some("do not question the Principia"));
        assert_eq!(reply.changes_atmosphere.as_deref(), Some("intellectually charged"));
    }
}
