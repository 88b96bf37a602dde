use thiserror::Error;

/// Violations of domain invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("participant name '{0}' already exists in this room")]
    DuplicateParticipantName(String),
}
