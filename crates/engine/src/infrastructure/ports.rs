//! Port traits decoupling the engine from concrete backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salon_domain::{
    ConversationStageAssessment, Message, ResponseModulation, Room, RoomId,
};
use thiserror::Error;

/// Failures talking to the language model backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("cannot reach model backend: {0}")]
    Connection(String),

    #[error("model request timed out: {0}")]
    Timeout(String),

    /// The configured model does not exist on the backend. Retrying cannot
    /// help; the deployment is misconfigured.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model output could not be parsed: {0}")]
    Parse(String),

    #[error("model backend error: {0}")]
    Backend(String),

    #[error("model output failed validation: {0}")]
    Validation(String),
}

impl LlmError {
    /// ModelNotFound is configuration-fatal; everything else is worth a retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::ModelNotFound(_))
    }

    /// Stable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            LlmError::Connection(_) => "CONNECTION",
            LlmError::Timeout(_) => "TIMEOUT",
            LlmError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            LlmError::Parse(_) => "PARSE",
            LlmError::Backend(_) => "API",
            LlmError::Validation(_) => "VALIDATION",
        }
    }
}

/// A single generation request. Sampling parameters and timeouts are client
/// configuration, not part of the call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    /// JSON schema constraining the output; `None` for free text.
    pub format: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn structured(prompt: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            format: Some(schema),
        }
    }

    pub fn free_text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: None,
        }
    }
}

/// Port for the language model backend.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Run one generation and return the parsed JSON output (for structured
    /// requests) or a JSON string value (for free text).
    async fn generate(&self, request: GenerateRequest) -> Result<serde_json::Value, LlmError>;
}

/// Failures in the persistence layer.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("room not found: {0}")]
    NotFound(RoomId),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

/// Cached background assessment for a room. Either half may be missing if
/// the corresponding assessment failed.
#[derive(Debug, Clone, Default)]
pub struct CachedAssessment {
    pub stage: Option<ConversationStageAssessment>,
    pub modulation: Option<ResponseModulation>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CachedAssessment {
    pub fn is_empty(&self) -> bool {
        self.stage.is_none() && self.modulation.is_none()
    }
}

/// Port for room and message persistence.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError>;

    async fn get_room(&self, id: RoomId) -> Result<Room, RepoError>;

    /// Most recently active rooms first.
    async fn list_rooms(&self, limit: u32) -> Result<Vec<Room>, RepoError>;

    async fn append_message(&self, room_id: RoomId, message: &Message) -> Result<(), RepoError>;

    /// Chronological order.
    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, RepoError>;

    async fn update_participant_state(
        &self,
        room_id: RoomId,
        participant_name: &str,
        current_state: &str,
        last_spoke: DateTime<Utc>,
    ) -> Result<(), RepoError>;

    async fn update_atmosphere(&self, room_id: RoomId, atmosphere: &str) -> Result<(), RepoError>;

    async fn update_context_summary(
        &self,
        room_id: RoomId,
        summary: &str,
    ) -> Result<(), RepoError>;

    /// Last write wins; a later assessment silently replaces an earlier one.
    async fn cache_assessment(
        &self,
        room_id: RoomId,
        assessment: &CachedAssessment,
    ) -> Result<(), RepoError>;

    async fn get_cached_assessment(
        &self,
        room_id: RoomId,
    ) -> Result<Option<CachedAssessment>, RepoError>;
}

/// Port for wall-clock time, so tests can pin timestamps.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
