//! Rule errors raised by the pure simulation logic.

use thiserror::Error;

/// A request that the simulation rules refuse before any mutation happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("memory store is full ({capacity} records) and eviction is disabled")]
    CapacityExceeded { capacity: usize },

    #[error("agent {0} cannot hold a relationship with itself")]
    SelfRelationship(u32),

    #[error("agent {0} is deceased")]
    Deceased(u32),

    #[error("goal {0} not found")]
    UnknownGoal(u64),

    #[error("goal {goal} progress cannot move backwards ({current} -> {requested})")]
    ProgressRegression { goal: u64, current: f32, requested: f32 },

    #[error("{field} = {value} is outside its valid range")]
    OutOfRange { field: &'static str, value: f32 },
}

/// A bounded field or structural invariant found broken after an update.
///
/// Unlike [`RuleError`], this signals a defect in the simulation itself and
/// must abort the turn that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{subject}: {detail}")]
pub struct InvariantBreach {
    /// What broke, e.g. `agent 4` or `faction Alpha`.
    pub subject: String,
    pub detail: String,
}

impl InvariantBreach {
    pub fn new(agent: u32, detail: impl Into<String>) -> Self {
        Self {
            subject: format!("agent {agent}"),
            detail: detail.into(),
        }
    }

    pub fn faction(name: &str, detail: impl Into<String>) -> Self {
        Self {
            subject: format!("faction {name}"),
            detail: detail.into(),
        }
    }
}
