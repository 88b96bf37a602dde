//! The full turn: user message in, persona messages out.

use std::sync::Arc;

use salon_domain::{AuthorType, Message, MessageMetadata, RoomId};

use crate::infrastructure::app_config::EngineConfig;
use crate::infrastructure::ports::{ClockPort, LlmError, LlmPort, RoomStore};
use crate::prompts::Locale;
use crate::use_cases::{
    AssessConversation, CompressContext, EngineError, GenerateExchange, GenerateReply,
    OrchestrateTurn,
};

pub struct ProcessMessage {
    store: Arc<dyn RoomStore>,
    clock: Arc<dyn ClockPort>,
    orchestrate: OrchestrateTurn,
    respond: GenerateReply,
    exchange: GenerateExchange,
    compress: CompressContext,
    assess: Arc<AssessConversation>,
    config: EngineConfig,
}

impl ProcessMessage {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        store: Arc<dyn RoomStore>,
        clock: Arc<dyn ClockPort>,
        config: EngineConfig,
    ) -> Self {
        Self {
            orchestrate: OrchestrateTurn::new(llm.clone(), config.recent_message_window),
            respond: GenerateReply::new(llm.clone()),
            exchange: GenerateExchange::new(llm.clone()),
            compress: CompressContext::new(llm.clone()),
            assess: Arc::new(AssessConversation::new(
                llm,
                store.clone(),
                clock.clone(),
                config.assessment_message_window,
            )),
            store,
            clock,
            config,
        }
    }

    /// Run one turn for `room_id` and return the persona messages it
    /// produced, in creation order.
    pub async fn execute(
        &self,
        room_id: RoomId,
        content: &str,
        locale: Locale,
    ) -> Result<Vec<Message>, EngineError> {
        let mut room = self.store.get_room(room_id).await?;

        let user_message = Message::new("User", AuthorType::User, content, self.clock.now());
        self.store.append_message(room_id, &user_message).await?;
        room.append_message(user_message);

        let cached = self.store.get_cached_assessment(room_id).await?;
        let plan = self
            .orchestrate
            .execute(content, &room, cached.as_ref(), locale)
            .await?;

        let mut responses = Vec::new();

        for entry in plan.plan.iter().filter(|e| e.when.executes_now()) {
            let Some(character) = room.participant_by_name(&entry.who).cloned() else {
                tracing::warn!(who = %entry.who, "planned speaker is not in the room, skipping");
                continue;
            };

            let reply = self
                .respond
                .execute(&character, content, &room, &entry.why, locale)
                .await?;

            let message = Message::new(
                &reply.speaker,
                AuthorType::Participant,
                &reply.speech,
                self.clock.now(),
            )
            .with_metadata(MessageMetadata {
                emotion: Some(reply.delivery.clone()),
                internal_thought: Some(reply.internal_state.clone()),
                subtext: reply.subtext.clone(),
                ..Default::default()
            });

            self.store.append_message(room_id, &message).await?;
            room.append_message(message.clone());
            responses.push(message);

            if let Some(atmosphere) = &reply.changes_atmosphere {
                // Takes effect for the remaining plan entries this turn.
                room.atmosphere = atmosphere.clone();
                self.store.update_atmosphere(room_id, atmosphere).await?;
            }

            let spoke_at = self.clock.now();
            self.store
                .update_participant_state(room_id, &character.name, &reply.internal_state, spoke_at)
                .await?;
            for p in &mut room.participants {
                if p.name.eq_ignore_ascii_case(&character.name) {
                    p.current_state = reply.internal_state.clone();
                    p.last_spoke = Some(spoke_at);
                }
            }
        }

        if plan.continue_without_user && !responses.is_empty() {
            match self
                .exchange
                .execute(&room, &plan.expected_dynamic, locale)
                .await
            {
                Ok(exchange) => {
                    for line in exchange
                        .exchanges
                        .iter()
                        .take(self.config.max_exchange_messages)
                    {
                        let message = Message::new(
                            &line.speaker,
                            AuthorType::Participant,
                            &line.text,
                            self.clock.now(),
                        )
                        .with_metadata(MessageMetadata {
                            manner: Some(line.manner.clone()),
                            effect: Some(line.effect.clone()),
                            ..Default::default()
                        });

                        self.store.append_message(room_id, &message).await?;
                        room.append_message(message.clone());
                        responses.push(message);
                    }
                }
                Err(e @ LlmError::ModelNotFound(_)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "exchange generation failed, continuing without it");
                }
            }
        }

        if room.messages.len() > self.config.compression_threshold {
            match self.compress.execute(&room, locale).await {
                Ok(summary) => {
                    if let Err(e) = self
                        .store
                        .update_context_summary(room_id, &summary.essence)
                        .await
                    {
                        tracing::warn!(error = %e, "failed to store context summary");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "context compression failed, continuing");
                }
            }
        }

        if !responses.is_empty() {
            self.assess
                .clone()
                .spawn_background(room_id, content.to_string(), room);
        }

        tracing::info!(room_id = %room_id, responses = responses.len(), "turn complete");
        Ok(responses)
    }
}
