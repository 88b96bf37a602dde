//! Conversation use cases.
//!
//! Each use case is a small struct holding its ports behind `Arc<dyn _>`,
//! with a single `execute` entry point.

pub mod assess;
pub mod compress;
pub mod exchange;
pub mod orchestrate;
pub mod process_message;
pub mod respond;
pub mod setup_room;

pub use assess::AssessConversation;
pub use compress::CompressContext;
pub use exchange::GenerateExchange;
pub use orchestrate::OrchestrateTurn;
pub use process_message::ProcessMessage;
pub use respond::GenerateReply;
pub use setup_room::{SetupOutcome, SetupRoom};

use thiserror::Error;

use crate::infrastructure::ports::{LlmError, RepoError};

/// Errors a turn can surface to the API layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}
