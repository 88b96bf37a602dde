use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ParticipantId;

/// A persona inhabiting a room.
///
/// `current_state` is the only routinely mutated field: it tracks the
/// persona's mood and is refreshed after each utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Who this persona is (biography, role, perspective).
    pub identity: String,
    /// How this persona speaks and behaves.
    pub personality: String,
    /// Mutable mood descriptor, e.g. "curious and attentive".
    pub current_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_spoke: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        identity: impl Into<String>,
        personality: impl Into<String>,
        current_state: impl Into<String>,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            identity: identity.into(),
            personality: personality.into(),
            current_state: current_state.into(),
            last_spoke: None,
        }
    }
}
