//! Error taxonomy for the turn engine and its collaborators.

use demiurge_logic::agent::Turn;
use demiurge_logic::error::{InvariantBreach, RuleError};
use thiserror::Error;

use crate::world::WorldId;

/// Why a request collided with another one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("a turn is already in progress for world {0}")]
    TurnInProgress(WorldId),

    #[error("stale commit: stored turn {stored}, attempted {attempted}")]
    StaleCommit { stored: Turn, attempted: Turn },

    #[error("intervention {0} was already applied")]
    AlreadyApplied(String),
}

/// Every way a simulation request can fail.
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected before any mutation.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("{0} not found")]
    NotFound(String),

    #[error("external collaborator unavailable: {0}")]
    ExternalUnavailable(String),

    /// The turn was aborted and nothing was committed.
    #[error("invariant violated: {0}")]
    InvariantViolation(#[from] InvariantBreach),
}

impl SimError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<RuleError> for SimError {
    fn from(e: RuleError) -> Self {
        SimError::Validation(e.to_string())
    }
}

impl From<ConflictKind> for SimError {
    fn from(kind: ConflictKind) -> Self {
        SimError::Conflict(kind)
    }
}

/// Errors from a [`crate::persistence::WorldStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("world {0} not found")]
    NotFound(WorldId),

    #[error("commit of turn {attempted} does not advance stored turn {stored}")]
    Conflict { stored: Turn, attempted: Turn },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] Box<bincode::ErrorKind>),

    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for SimError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SimError::NotFound(format!("world {id}")),
            StoreError::Conflict { stored, attempted } => {
                SimError::Conflict(ConflictKind::StaleCommit { stored, attempted })
            }
            other => SimError::ExternalUnavailable(other.to_string()),
        }
    }
}

/// Errors from a [`crate::narrative::NarrativeService`].
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed narrative payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<NarrativeError> for SimError {
    fn from(e: NarrativeError) -> Self {
        match e {
            NarrativeError::Unavailable(reason) => SimError::ExternalUnavailable(reason),
            NarrativeError::Malformed(err) => SimError::Validation(err.to_string()),
        }
    }
}
