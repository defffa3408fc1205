//! Demiurge Core - world state, turn orchestration and collaborator seams
//!
//! A world of autonomous agents advances one turn at a time. Each turn
//! applies at most one intervention, advances every living agent through
//! the rules in `demiurge_logic`, advances the environment, validates every
//! invariant, and only then replaces the stored world.
//!
//! # Architecture
//!
//! - **World**: agents in an ordered map, factions, environment, logs
//! - **Generation**: deterministic genesis from setup answers and a seed
//! - **Turn**: the staged `Resolving → Advancing → AdvancingWorld → Committed` pipeline
//! - **Engine**: per-world turn gate plus the persistence and narrative seams
//!
//! # Example
//!
//! ```rust,no_run
//! use demiurge_core::prelude::*;
//!
//! let setup = SetupConfig::from_json(&std::fs::read_to_string("data/setup_example.json")?)?;
//! let engine = SimulationEngine::new(InMemoryStore::new(), Chronicler, SimConfig::default())?;
//! engine.create_world(1, "Aster", 42, setup)?;
//!
//! for _ in 0..10 {
//!     let outcome = engine.advance_turn(1, None)?;
//!     println!("turn {}: {} deaths", outcome.turn, outcome.delta.deaths.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod generation;
pub mod intervention;
pub mod narrative;
pub mod persistence;
pub mod setup;
pub mod turn;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::delta::WorldDelta;
    pub use crate::engine::{NarrativeOutcome, SimulationEngine, TurnOutcome};
    pub use crate::error::{ConflictKind, SimError};
    pub use crate::intervention::{AgentResolution, Intervention};
    pub use crate::narrative::{Chronicler, NarrativeService};
    pub use crate::persistence::{InMemoryStore, WorldStore};
    pub use crate::setup::SetupConfig;
    pub use crate::turn::TurnOrchestrator;
    pub use crate::world::{WorldId, WorldState};
    pub use demiurge_logic::config::SimConfig;
}
