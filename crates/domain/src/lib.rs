//! Salon domain types.
//!
//! Core entities and value objects for multi-persona conversation rooms:
//! rooms, participants, the append-only message log, cached conversation
//! assessments, and the structured outputs the engine expects back from
//! the language model.

pub mod assessment;
pub mod error;
pub mod ids;
pub mod message;
pub mod outputs;
pub mod participant;
pub mod room;

pub use assessment::{
    ConversationStageAssessment, Momentum, Priority, ResponseDepth, ResponseModulation,
    SuggestedDepth, TargetLength, UserState,
};
pub use error::DomainError;
pub use ids::{MessageId, ParticipantId, RoomId};
pub use message::{AuthorType, Message, MessageMetadata};
pub use outputs::{
    CharacterReply, CompressionSummary, ExchangeLine, ExchangeResponse, OrchestrationPlan,
    PersonaProfile, PlanEntry, ResponseTiming, SetupResponse,
};
pub use participant::Participant;
pub use room::{Room, RoomState, RoomStatus};
