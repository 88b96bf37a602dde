use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::RoomId;
use crate::message::Message;
use crate::participant::Participant;

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Setup,
    Active,
    WaitingUser,
    Processing,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Setup => "setup",
            RoomStatus::Active => "active",
            RoomStatus::WaitingUser => "waiting_user",
            RoomStatus::Processing => "processing",
        }
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(RoomStatus::Setup),
            "active" => Ok(RoomStatus::Active),
            "waiting_user" => Ok(RoomStatus::WaitingUser),
            "processing" => Ok(RoomStatus::Processing),
            other => Err(format!("unknown room status '{other}'")),
        }
    }
}

/// Evolving conversational state of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub status: RoomStatus,
    /// Compressed summary of conversation so far, empty until compression runs.
    #[serde(default)]
    pub context_summary: String,
    #[serde(default)]
    pub turn_count: u32,
    pub last_activity: DateTime<Utc>,
    /// Current social dynamic, e.g. "lively debate".
    #[serde(default)]
    pub current_dynamic: String,
}

impl RoomState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: RoomStatus::Active,
            context_summary: String::new(),
            turn_count: 0,
            last_activity: now,
            current_dynamic: String::new(),
        }
    }
}

/// A conversation room: personas, an append-only message log, and mood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Chronological; only ever appended to.
    pub messages: Vec<Message>,
    pub state: RoomState,
    /// Free-text mood descriptor, e.g. "quiet anticipation".
    pub atmosphere: String,
}

impl Room {
    pub fn new(
        participants: Vec<Participant>,
        topic: Option<String>,
        atmosphere: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut seen = std::collections::HashSet::new();
        for p in &participants {
            if !seen.insert(p.name.to_lowercase()) {
                return Err(DomainError::DuplicateParticipantName(p.name.clone()));
            }
        }
        Ok(Self {
            id: RoomId::new(),
            participants,
            topic,
            messages: Vec::new(),
            state: RoomState::new(now),
            atmosphere: atmosphere.into(),
        })
    }

    pub fn append_message(&mut self, message: Message) {
        self.state.last_activity = message.timestamp;
        self.messages.push(message);
    }

    /// The most recent `window` messages in chronological order.
    pub fn recent_messages(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }

    /// Case-insensitive participant lookup by name.
    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn first_participant(&self) -> Option<&Participant> {
        self.participants.first()
    }
}
