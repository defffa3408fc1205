//! Simulation engine - main entry point for creating worlds and running turns
//!
//! The engine ties the turn orchestrator to its two collaborators. One turn
//! is `load → run → commit → record decision → narrate`; a second request for
//! a world whose turn is still in flight is rejected, not queued. Narration
//! runs after the commit on the committed snapshot, so a narrator failure
//! never rolls a turn back: the turn's event is stored as pending and can be
//! retried with [`SimulationEngine::retry_narrative`].

use std::collections::HashSet;
use std::sync::Mutex;

use demiurge_logic::agent::Turn;
use demiurge_logic::config::SimConfig;

use crate::delta::WorldDelta;
use crate::error::{ConflictKind, SimError};
use crate::generation::{genesis, GenesisOptions};
use crate::intervention::Intervention;
use crate::narrative::{NarrativeResponse, NarrativeService, Projection, DEFAULT_RECENT_EVENTS};
use crate::persistence::{EventRecord, NarrativeStatus, WorldStore};
use crate::setup::SetupConfig;
use crate::turn::TurnOrchestrator;
use crate::world::{WorldId, WorldState};

/// Narrative result of a committed turn.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    Ready(NarrativeResponse),
    /// The narrator failed; the turn is committed regardless.
    Pending(String),
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub world: WorldId,
    pub turn: Turn,
    pub delta: WorldDelta,
    pub narrative: NarrativeOutcome,
}

/// Marks a world as having a turn in flight until dropped.
pub struct TurnLease<'a> {
    in_flight: &'a Mutex<HashSet<WorldId>>,
    world: WorldId,
}

impl Drop for TurnLease<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.world);
        }
    }
}

/// Main simulation engine
pub struct SimulationEngine<S, N> {
    store: S,
    narrator: N,
    config: SimConfig,
    options: GenesisOptions,
    recent_events: usize,
    in_flight: Mutex<HashSet<WorldId>>,
}

impl<S: WorldStore, N: NarrativeService> SimulationEngine<S, N> {
    /// Create an engine. Rejects out-of-range tuning.
    pub fn new(store: S, narrator: N, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            store,
            narrator,
            config,
            options: GenesisOptions::default(),
            recent_events: DEFAULT_RECENT_EVENTS,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn with_genesis_options(mut self, options: GenesisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_recent_events(mut self, recent: usize) -> Self {
        self.recent_events = recent;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Latest committed snapshot of a world.
    pub fn world(&self, id: WorldId) -> Result<WorldState, SimError> {
        Ok(self.store.load_world(id)?)
    }

    /// Create and commit a world from completed setup answers.
    pub fn create_world(
        &self,
        id: WorldId,
        name: &str,
        seed: u64,
        setup: SetupConfig,
    ) -> Result<WorldState, SimError> {
        let _lease = self.lease(id)?;
        let world = genesis(id, name, seed, setup, &self.options, &self.config).map_err(|e| {
            log::warn!("world {id} creation rejected: {e}");
            e
        })?;
        self.store.commit_world(&world)?;
        Ok(world)
    }

    /// Reserve `id` for one turn, or fail if a turn is already in flight.
    pub fn lease(&self, id: WorldId) -> Result<TurnLease<'_>, SimError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| SimError::ExternalUnavailable("turn gate poisoned".into()))?;
        if !set.insert(id) {
            log::warn!("turn request for world {id} rejected: turn in progress");
            return Err(ConflictKind::TurnInProgress(id).into());
        }
        Ok(TurnLease {
            in_flight: &self.in_flight,
            world: id,
        })
    }

    /// Run one turn of world `id`, applying `intervention` first if given.
    pub fn advance_turn(&self, id: WorldId, intervention: Option<Intervention>) -> Result<TurnOutcome, SimError> {
        let _lease = self.lease(id)?;
        let world = self.store.load_world(id)?;

        let mut orchestrator = TurnOrchestrator::new(self.config.clone());
        let (next, delta) = orchestrator
            .run(&world, intervention.as_ref())
            .map_err(|e| {
                log::warn!("turn {} of world {id} rejected: {e}", world.turn + 1);
                e
            })?;
        self.store.commit_world(&next)?;
        log::info!(
            "world {id} committed turn {}: {} births, {} deaths",
            next.turn,
            delta.births.len(),
            delta.deaths.len()
        );

        if let Some(iv) = &intervention {
            if let Err(e) = self.store.record_decision(id, next.turn, iv) {
                log::warn!("decision {} for world {id} not recorded: {e}", iv.id);
            }
        }

        let narrative = self.narrate(&next, &delta);
        let status = match &narrative {
            NarrativeOutcome::Ready(response) => NarrativeStatus::Ready(response.clone()),
            NarrativeOutcome::Pending(reason) => NarrativeStatus::Pending { reason: reason.clone() },
        };
        let record = EventRecord {
            turn: next.turn,
            delta: delta.clone(),
            narrative: status,
        };
        if let Err(e) = self.store.append_event(id, next.turn, record) {
            log::warn!("event for turn {} of world {id} not stored: {e}", next.turn);
        }

        Ok(TurnOutcome {
            world: id,
            turn: next.turn,
            delta,
            narrative,
        })
    }

    /// Generate the narrative for a committed turn whose narration is
    /// pending. Only the latest turn of a world can be retried.
    pub fn retry_narrative(&self, id: WorldId, turn: Turn) -> Result<NarrativeResponse, SimError> {
        let _lease = self.lease(id)?;
        let mut record = self
            .store
            .event(id, turn)?
            .ok_or_else(|| SimError::NotFound(format!("event for turn {turn} of world {id}")))?;
        match &record.narrative {
            NarrativeStatus::Ready(response) => return Ok(response.clone()),
            NarrativeStatus::Legacy(_) => {
                return Err(SimError::Validation(format!("turn {turn} carries a legacy narrative")));
            }
            NarrativeStatus::Pending { .. } => {}
        }

        let world = self.store.load_world(id)?;
        if world.turn != turn {
            return Err(SimError::Validation(format!(
                "turn {turn} is no longer the latest (world is at {})",
                world.turn
            )));
        }
        let projection = Projection::build(&world, &record.delta, self.recent_events);
        let response = self.narrator.narrate(&projection).map_err(|e| {
            log::warn!("narrative retry for turn {turn} of world {id} failed: {e}");
            e
        })?;
        record.narrative = NarrativeStatus::Ready(response.clone());
        self.store.append_event(id, turn, record)?;
        Ok(response)
    }

    fn narrate(&self, world: &WorldState, delta: &WorldDelta) -> NarrativeOutcome {
        let projection = Projection::build(world, delta, self.recent_events);
        match self.narrator.narrate(&projection) {
            Ok(response) => NarrativeOutcome::Ready(response),
            Err(e) => {
                log::warn!("narrative for turn {} of world {} pending: {e}", world.turn, world.id);
                NarrativeOutcome::Pending(e.to_string())
            }
        }
    }
}
