//! Room setup: turn free-text input into personas and a seeded room.

use std::sync::Arc;

use salon_domain::{
    AuthorType, Message, MessageMetadata, Participant, PersonaProfile, Room, SetupResponse,
};

use crate::infrastructure::ports::{ClockPort, GenerateRequest, LlmError, LlmPort, RoomStore};
use crate::prompts::{build_setup_prompt, Locale};
use crate::schemas::setup_schema;
use crate::use_cases::EngineError;

const MAX_PERSONAS: usize = 10;

pub struct SetupRoom {
    llm: Arc<dyn LlmPort>,
    store: Arc<dyn RoomStore>,
    clock: Arc<dyn ClockPort>,
}

#[derive(Debug)]
pub struct SetupOutcome {
    pub room: Room,
    pub setup: SetupResponse,
}

impl SetupRoom {
    pub fn new(llm: Arc<dyn LlmPort>, store: Arc<dyn RoomStore>, clock: Arc<dyn ClockPort>) -> Self {
        Self { llm, store, clock }
    }

    /// Create a room from the user's request for conversation partners.
    ///
    /// Falls back to deterministic personas derived from the input when the
    /// model fails in any recoverable way; only a missing model propagates.
    pub async fn execute(
        &self,
        user_input: &str,
        focus: Option<&str>,
        locale: Locale,
    ) -> Result<SetupOutcome, EngineError> {
        let mut setup = self.request_setup(user_input, focus, locale).await?;
        setup.participants = dedup_by_name(&setup.participants)
            .into_iter()
            .take(MAX_PERSONAS)
            .cloned()
            .collect();

        let now = self.clock.now();
        let participants: Vec<Participant> = setup
            .participants
            .iter()
            .map(|p| Participant::new(&p.name, &p.identity, &p.personality, &p.current_state))
            .collect();

        let atmosphere = if setup.atmosphere.is_empty() {
            "Welcoming and open".to_string()
        } else {
            setup.atmosphere.clone()
        };
        let topic = focus
            .map(str::to_string)
            .or_else(|| setup.suggested_opening.clone());

        let mut room = Room::new(participants, topic, atmosphere, now)
            .map_err(|e| LlmError::Validation(e.to_string()))?;

        room.append_message(
            Message::new("System", AuthorType::System, &setup.setting, now).with_metadata(
                MessageMetadata {
                    emotion: Some(setup.atmosphere.clone()),
                    ..Default::default()
                },
            ),
        );
        for profile in &setup.participants {
            room.append_message(
                Message::new(&profile.name, AuthorType::Participant, &profile.greeting, now)
                    .with_metadata(MessageMetadata {
                        emotion: Some(profile.current_state.clone()),
                        internal_thought: Some(format!(
                            "Entering the conversation as {}",
                            profile.identity
                        )),
                        ..Default::default()
                    }),
            );
        }

        self.store.create_room(&room).await?;
        tracing::info!(room_id = %room.id, participants = room.participants.len(), "room created");

        Ok(SetupOutcome { room, setup })
    }

    async fn request_setup(
        &self,
        user_input: &str,
        focus: Option<&str>,
        locale: Locale,
    ) -> Result<SetupResponse, EngineError> {
        let prompt = build_setup_prompt(user_input, focus, locale);
        let request = GenerateRequest::structured(prompt, setup_schema());

        match self.llm.generate(request).await {
            Ok(value) => match serde_json::from_value::<SetupResponse>(value) {
                Ok(setup) if !setup.participants.is_empty() => Ok(setup),
                Ok(_) => {
                    tracing::warn!("setup produced no personas, using fallback");
                    Ok(fallback_setup(user_input))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "setup response malformed, using fallback");
                    Ok(fallback_setup(user_input))
                }
            },
            Err(e @ LlmError::ModelNotFound(_)) => Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "setup failed, using fallback");
                Ok(fallback_setup(user_input))
            }
        }
    }
}

fn dedup_by_name(profiles: &[PersonaProfile]) -> Vec<&PersonaProfile> {
    let mut seen = std::collections::HashSet::new();
    profiles
        .iter()
        .filter(|p| !p.name.trim().is_empty() && seen.insert(p.name.to_lowercase()))
        .collect()
}

/// Derive personas from the raw input: split on commas, ampersands, plus
/// signs, or the word "and". No tokens yields a single generic assistant.
fn fallback_setup(user_input: &str) -> SetupResponse {
    let names = split_persona_names(user_input);

    let participants = if names.is_empty() {
        vec![PersonaProfile {
            name: "Assistant".to_string(),
            identity: "A helpful AI assistant ready to have a conversation".to_string(),
            personality: "Friendly, curious, and thoughtful".to_string(),
            greeting: "Hello! I'm ready to chat with you.".to_string(),
            current_state: "Attentive and welcoming".to_string(),
        }]
    } else {
        names
            .into_iter()
            .map(|name| PersonaProfile {
                identity: format!("{name} - a notable figure ready for conversation"),
                personality: "Engaging and thoughtful in discussion".to_string(),
                greeting: format!("Hello! I'm {name}. I'm pleased to meet you."),
                current_state: "Ready and attentive".to_string(),
                name,
            })
            .collect()
    };

    SetupResponse {
        success: true,
        participants,
        setting: "A comfortable virtual space for conversation".to_string(),
        atmosphere: "Welcoming and open".to_string(),
        suggested_opening: Some("What would you like to discuss?".to_string()),
    }
}

fn split_persona_names(input: &str) -> Vec<String> {
    let mut names = Vec::new();
    for chunk in input.split([',', '&', '+']) {
        // " and " also separates names within a chunk
        for name in split_on_and(chunk) {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                names.push(trimmed.to_string());
            }
        }
    }
    names
}

fn split_on_and(chunk: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = chunk;
    loop {
        match find_and_separator(rest) {
            Some((start, end)) => {
                parts.push(&rest[..start]);
                rest = &rest[end..];
            }
            None => {
                parts.push(rest);
                return parts;
            }
        }
    }
}

/// Locate " and " as a standalone word, case-sensitive like the original
/// splitter, returning the byte range of the separator.
fn find_and_separator(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find("and") {
        let start = search_from + pos;
        let end = start + 3;
        let preceded = text[..start].ends_with(char::is_whitespace);
        let followed = text[end..].starts_with(char::is_whitespace);
        if preceded && followed {
            let sep_start = text[..start].trim_end().len();
            let sep_end = end + (text[end..].len() - text[end..].trim_start().len());
            return Some((sep_start, sep_end));
        }
        search_from = end.min(bytes.len());
    }
    None
}
