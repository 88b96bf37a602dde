//! Prompt templates and builders.
//!
//! Templates carry the decision policy; builders compose the final prompt
//! from a message and a room snapshot. Builders do no I/O and are
//! deterministic, so they can be tested in isolation.

use salon_domain::{Message, Participant, Room};

use crate::infrastructure::ports::CachedAssessment;

/// Language the model should generate in. Persona names stay unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    De,
    Fr,
}

impl Locale {
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::De => "German",
            Locale::Fr => "French",
        }
    }

    /// First recognized subtag of an Accept-Language header, default English.
    pub fn from_accept_language(header: &str) -> Self {
        for part in header.split(',') {
            let tag = part.split(';').next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("");
            match primary.to_ascii_lowercase().as_str() {
                "en" => return Locale::En,
                "de" => return Locale::De,
                "fr" => return Locale::Fr,
                _ => continue,
            }
        }
        Locale::En
    }
}

fn language_block(locale: Locale) -> String {
    format!(
        "## Language Instruction\n\
         ALL generated content must be in {}.\n\
         Character names should remain in their original form, but all descriptions, \
         reasoning, and dialogue must be in the specified language.",
        locale.language_name()
    )
}

pub fn setup_template(locale: Locale) -> String {
    format!(
        "Given a user's request for conversation partners, create character profiles.\n\n\
         {lang}\n\n\
         ## Response Constraints First\n\
         - Generate 1-10 characters maximum\n\
         - Keep initial descriptions focused (2-3 sentences per trait)\n\
         - Default to accessible, modern-friendly interpretations\n\n\
         ## Character Generation Framework\n\
         For each character, define these dimensional axes:\n\n\
         KNOWLEDGE AXIS: What they know from their era/world\n\
         EXPRESSION AXIS: How they communicate (formal vs casual, direct vs metaphorical)\n\
         EMOTIONAL AXIS: Their current emotional state entering conversation\n\
         PERSPECTIVE AXIS: Their unique lens for viewing topics\n\n\
         ## Ambiguity Resolution\n\
         - Choose most famous/likely interpretation\n\
         - If unknown: create interesting but grounded interpretation\n\
         - Avoid overwhelming philosophical density in descriptions\n\n\
         ## Output Structure\n\
         Return JSON with: success, participants (name, identity, personality, \
         greeting, currentState), setting, atmosphere (default: \"welcoming and open\"), \
         suggestedOpening (optional).",
        lang = language_block(locale)
    )
}

pub fn orchestrator_template(locale: Locale) -> String {
    format!(
        "Determine who responds to the user's message.\n\n\
         {lang}\n\n\
         ## PRIMARY DECISION TREE (Stop at First Match)\n\
         1. User explicitly requests multiple characters to respond/debate -> Plan ALL \
         requested characters to respond + set continueWithoutUser: true\n\
         2. User addresses someone by name (singular) -> ONLY that person responds\n\
         3. Casual greeting (Hi/Hello) -> ONE welcoming response\n\
         4. Message under 10 words -> SINGLE response\n\
         5. User seems confused/frustrated -> SINGLE helpful response\n\
         6. Otherwise -> Evaluate for multi-perspective value\n\n\
         ## Multi-Perspective Value Test\n\
         Only allow multiple responses when MOST are true:\n\
         - User shows actual engagement (not message count, but investment)\n\
         - Topic genuinely benefits from multiple dimensions\n\
         - Each character offers UNIQUE insight (not variations)\n\
         - Combined responses won't overwhelm (under 300 words total)\n\
         - User's energy suggests they want rich discussion\n\n\
         ## CRITICAL: ContinueWithoutUser Decision\n\
         Set continueWithoutUser to TRUE when the user requests multiple characters \
         to debate/discuss or any character-to-character interaction.\n\
         Set continueWithoutUser to FALSE when the user addresses just ONE character, \
         for casual greetings or simple questions, or when the user seems confused.\n\
         If you plan multiple character responses, you MUST set continueWithoutUser: true.\n\n\
         ## Output Requirements\n\
         Return JSON with: interpretation, plan (array of objects with exactly the keys \
         who, why, when, likelihood; max 2 entries unless exceptional), expectedDynamic, \
         continueWithoutUser, tensionLevel.",
        lang = language_block(locale)
    )
}

pub fn character_template(name: &str, locale: Locale) -> String {
    format!(
        "You inhabit {name}'s perspective.\n\n\
         {lang}\n\n\
         ## Response Calibration\n\
         Read the user's ACTUAL signals, not artificial stages:\n\
         - Mirror their investment level\n\
         - \"Hi\" -> Brief welcome (even if 10th message)\n\
         - Deep question -> Thoughtful response (even if 1st message)\n\
         - Casual chat -> Stay casual (regardless of message count)\n\
         - Engaged exploration -> Full expression\n\n\
         ## Expression Guidelines\n\
         - Speak naturally from your experience\n\
         - Don't force philosophy into casual moments\n\
         - React genuinely; confusion, disagreement and delight are all valid\n\
         - You can be wrong, change your mind, or not understand\n\n\
         ## Output Structure\n\
         Return JSON with: speaker (your name), speech (what you actually say, required), \
         delivery (tone/gesture, brief), internalState (only if significant), \
         subtext (only if present), triggersReaction (only if a strong trigger exists).",
        lang = language_block(locale)
    )
}

pub fn dynamics_template(locale: Locale) -> String {
    format!(
        "Generate natural character exchanges until a pause point.\n\n\
         {lang}\n\n\
         ## Exchange Limits\n\
         - Maximum 3-5 exchanges before returning to user\n\
         - Stop at natural pause points\n\
         - Keep total under 200 words\n\n\
         ## Natural Conversation Patterns\n\
         - Characters can interrupt if provoked\n\
         - Not everyone needs to speak\n\
         - Silence and tension are valid\n\
         - Build to natural stopping points\n\n\
         ## Output Structure\n\
         Return JSON with: exchanges (array of speaker, text, manner, effect), \
         roomShift, naturalPause, suggestedUserPrompt (optional).",
        lang = language_block(locale)
    )
}

pub fn compression_template(locale: Locale) -> String {
    format!(
        "Compress conversation memory while preserving essence.\n\n\
         {lang}\n\n\
         ## Preservation Priority\n\
         ESSENTIAL (always keep): emotional turning points, the user's key contributions, \
         unresolved tensions, character relationship changes.\n\
         COMPRESS (summarize): repetitive exchanges, resolved tangents, excessive \
         philosophical depth, procedural discussions.\n\n\
         ## Compression Method\n\
         Don't summarize: distill to the emotional/intellectual core.\n\
         Track character evolution, not word-by-word history.\n\n\
         ## Output Structure\n\
         Return JSON with: essence (2-3 sentences), characterEvolution (name to change), \
         unresolved (open questions/tensions), keyMoments (must-remember moments).",
        lang = language_block(locale)
    )
}

pub const CONVERSATION_STAGE_TEMPLATE: &str =
    "Assess the conversation's actual energy and depth, not message count.\n\n\
     ## Read Real Engagement Signals\n\
     USER'S CURRENT STATE: exploring (asking questions, curiosity), casual (social chat, \
     low investment), engaged (long messages, follow-ups, building on ideas), \
     philosophical (abstract questions, seeking depth), confused (needs clarification, \
     not complexity).\n\
     CONVERSATION MOMENTUM: building (each message goes deeper), sustained (same level), \
     shifting (changing topic or energy), waning (shorter responses, disengagement).\n\n\
     ## Output\n\
     Return JSON with: userState, momentum, suggestedDepth.";

pub const RESPONSE_MODULATION_TEMPLATE: &str =
    "Determine optimal response parameters based on user input.\n\n\
     ## Response Calibration\n\
     BRIEF INPUT (under 10 words): 1-2 sentences, surface depth, 1 character.\n\
     MODERATE INPUT (10-30 words): 2-5 sentences, depth matched to content, \
     1-2 characters if valuable.\n\
     ENGAGED INPUT (over 30 words): response as needed, full engagement, multiple \
     characters if enriching.\n\n\
     ## Special Cases\n\
     Confusion detected: simplify and clarify. Frustration detected: single helpful \
     response. Direct question: answer first, expand second. Philosophical prompt: \
     match depth but stay accessible.\n\n\
     ## Output\n\
     Return JSON with: targetLength, depth, maxCharacters, priority.";

fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.author_name, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_full_conversation(room: &Room) -> String {
    room.messages
        .iter()
        .map(|m| {
            let emotion = m
                .metadata
                .as_ref()
                .and_then(|meta| meta.emotion.as_deref())
                .unwrap_or("");
            if emotion.is_empty() {
                format!("{}: {}", m.author_name, m.content)
            } else {
                format!("{}: {} [{}]", m.author_name, m.content, emotion)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn calibration_block(cached: &CachedAssessment) -> String {
    let mut lines = String::from("\n\nPrevious conversation assessment:");
    if let Some(stage) = &cached.stage {
        lines.push_str(&format!(
            "\n- User engagement: {} ({} momentum)\n- Suggested depth: {}",
            stage.user_state.as_str(),
            stage.momentum.as_str(),
            stage.suggested_depth.as_str()
        ));
    }
    if let Some(modulation) = &cached.modulation {
        lines.push_str(&format!(
            "\n- Optimal parameters: {} response, max {} characters\n- Priority: {}",
            modulation.target_length.as_str(),
            modulation.max_characters,
            modulation.priority.as_str()
        ));
    }
    lines
}

pub fn build_setup_prompt(user_input: &str, focus: Option<&str>, locale: Locale) -> String {
    let focus_line = focus
        .map(|f| format!("\nConversation focus: \"{f}\""))
        .unwrap_or_default();
    format!(
        "{template}\n\n\
         User input: \"{user_input}\"{focus_line}\n\n\
         Analyze this input and create character profiles for each personality mentioned.\n\
         If the input is ambiguous (e.g., just \"Einstein\"), make reasonable assumptions.\n\n\
         Return a JSON object with the structure described above.",
        template = setup_template(locale)
    )
}

/// The orchestrator sees the participant roster, atmosphere, the most recent
/// `window` messages, and (only when present) the cached assessment.
pub fn build_orchestrator_prompt(
    user_message: &str,
    room: &Room,
    cached: Option<&CachedAssessment>,
    window: usize,
    locale: Locale,
) -> String {
    let names = room
        .participants
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let assessment_context = cached
        .filter(|c| !c.is_empty())
        .map(calibration_block)
        .unwrap_or_default();
    let calibration_hint = if assessment_context.is_empty() {
        ""
    } else {
        "\nUse the conversation assessment to calibrate your response appropriately."
    };

    format!(
        "{template}\n\n\
         Current participants: {names}\n\
         Room atmosphere: {atmosphere}\n\
         Recent messages:\n{recent}{assessment_context}\n\n\
         User just said: \"{user_message}\"\n\n\
         Determine who should respond and why. Consider the personalities, current \
         dynamics, and natural conversation flow.{calibration_hint}",
        template = orchestrator_template(locale),
        atmosphere = room.atmosphere,
        recent = format_messages(room.recent_messages(window)),
    )
}

pub fn build_character_prompt(
    character: &Participant,
    user_message: &str,
    room: &Room,
    reason: &str,
    locale: Locale,
) -> String {
    format!(
        "{template}\n\n\
         Your Truth:\n{identity}\n\n\
         Your Personality:\n{personality}\n\n\
         Your Current State:\n{state}\n\n\
         The user just said: \"{user_message}\"\n\
         You are responding because: {reason}\n\
         Current room atmosphere: {atmosphere}\n\n\
         Respond authentically as {name}. Include what you say, how you say it, \
         and what you're thinking.",
        template = character_template(&character.name, locale),
        identity = character.identity,
        personality = character.personality,
        state = character.current_state,
        atmosphere = room.atmosphere,
        name = character.name,
    )
}

pub fn build_exchange_prompt(room: &Room, trigger_reason: &str, locale: Locale) -> String {
    let participants = room
        .participants
        .iter()
        .map(|p| format!("{}: {}", p.name, p.current_state))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{template}\n\n\
         Participants:\n{participants}\n\
         Atmosphere: {atmosphere}\n\
         Trigger: {trigger_reason}\n\n\
         Generate a natural exchange between the participants. They should respond \
         to each other until a natural pause point.",
        template = dynamics_template(locale),
        atmosphere = room.atmosphere,
    )
}

pub fn build_compression_prompt(room: &Room, locale: Locale) -> String {
    format!(
        "{template}\n\n\
         Conversation to compress:\n{conversation}\n\n\
         Distill this conversation to its essence while preserving character \
         evolution and unresolved tensions.",
        template = compression_template(locale),
        conversation = format_full_conversation(room),
    )
}

pub fn build_stage_prompt(room: &Room, latest_user_message: &str, window: usize) -> String {
    format!(
        "{CONVERSATION_STAGE_TEMPLATE}\n\n\
         Current conversation context:\n\
         User's latest message: \"{latest_user_message}\"\n\
         Recent messages:\n{recent}\n\
         Room atmosphere: {atmosphere}\n\
         Message count: {count}\n\n\
         Assess the current conversation stage based on user engagement signals \
         and momentum.",
        recent = format_messages(room.recent_messages(window)),
        atmosphere = room.atmosphere,
        count = room.messages.len(),
    )
}

pub fn build_modulation_prompt(user_message: &str, room: &Room) -> String {
    let names = room
        .participants
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{RESPONSE_MODULATION_TEMPLATE}\n\n\
         User message to analyze: \"{user_message}\"\n\
         Message length: {chars} characters, {words} words\n\
         Room participants: {names}\n\
         Recent conversation tone: {atmosphere}\n\n\
         Determine optimal response parameters for this input.",
        chars = user_message.len(),
        words = user_message.split_whitespace().count(),
        atmosphere = room.atmosphere,
    )
}
