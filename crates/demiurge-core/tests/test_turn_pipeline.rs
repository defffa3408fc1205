//! Integration tests for the turn pipeline and the engine around it.
//!
//! Exercises: Intervention → Resolving → Advancing → AdvancingWorld
//! → Committed → store commit → narration
//!
//! Collaborators are the in-process store plus small scripted narrators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use demiurge_core::engine::{NarrativeOutcome, SimulationEngine};
use demiurge_core::error::{ConflictKind, NarrativeError, SimError};
use demiurge_core::generation::{genesis, GenesisOptions};
use demiurge_core::intervention::Intervention;
use demiurge_core::narrative::{Chronicler, NarrativeResponse, NarrativeService, Projection};
use demiurge_core::persistence::{load_world, save_world, InMemoryStore, NarrativeStatus, WorldStore};
use demiurge_core::setup::SetupConfig;
use demiurge_core::turn::{TurnOrchestrator, TurnPhase};
use demiurge_core::world::WorldState;
use demiurge_logic::agent::{Agent, Personality};
use demiurge_logic::config::SimConfig;
use demiurge_logic::faction::{Faction, FactionField, FactionStats, LegacyStats};

// ── Helpers ────────────────────────────────────────────────────────────

fn setup() -> SetupConfig {
    SetupConfig::from_json(include_str!("../../../data/setup_example.json")).unwrap()
}

fn legacy(name: &str, wealth: f32) -> Faction {
    Faction::new(
        name,
        FactionStats::Legacy(LegacyStats {
            wealth: Some(wealth),
            military: Some(60.0),
            population: Some(2000.0),
        }),
    )
}

/// A hand-built world sitting at turn 3 with two factions and two agents.
fn world_at_turn_three() -> WorldState {
    let mut world = WorldState::new(1, "Vale", 99, SetupConfig::default());
    world.factions.insert("Alpha".into(), legacy("Alpha", 80.0));
    world.factions.insert("Beta".into(), legacy("Beta", 10.0));
    for id in [1, 2] {
        let mut agent = Agent::new(id, format!("agent {id}"), "human", 0, Personality::default());
        agent.needs.hunger = 0.8;
        agent.needs.thirst = 0.7;
        world.insert_agent(agent).unwrap();
    }
    world.turn = 3;
    world.setup_complete = true;
    world
}

fn reduce_wealth(id: &str) -> Intervention {
    Intervention::new(id)
        .with_description("reduce Alpha wealth by 20")
        .with_faction_change("Alpha", FactionField::Wealth, -20.0)
        .with_faction_change("Beta", FactionField::Wealth, -20.0)
}

/// Fails while `failing` is set.
struct FlakyNarrator {
    failing: AtomicBool,
}

impl NarrativeService for FlakyNarrator {
    fn narrate(&self, projection: &Projection) -> Result<NarrativeResponse, NarrativeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NarrativeError::Unavailable("model offline".into()));
        }
        Chronicler.narrate(projection)
    }
}

/// Signals when narration starts, then waits to be released.
struct GatedNarrator {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl NarrativeService for GatedNarrator {
    fn narrate(&self, projection: &Projection) -> Result<NarrativeResponse, NarrativeError> {
        let _ = self.entered.lock().map(|tx| tx.send(()));
        let _ = self.release.lock().map(|rx| rx.recv());
        Chronicler.narrate(projection)
    }
}

// ── Resolving and decay ────────────────────────────────────────────────

#[test]
fn intervention_commits_next_turn_with_one_tick_of_decay() {
    let config = SimConfig::default();
    let mut world = world_at_turn_three();
    let before = world.agent(1).unwrap().clone();

    let mut turns = TurnOrchestrator::new(config.clone());
    let delta = turns.advance(&mut world, Some(&reduce_wealth("iv-1"))).unwrap();

    assert_eq!(world.turn, 4);
    assert_eq!(delta.turn, 4);
    assert_eq!(turns.phase(), TurnPhase::Committed);
    assert_eq!(world.factions["Alpha"].value(FactionField::Wealth), Some(60.0));
    assert_eq!(world.factions["Beta"].value(FactionField::Wealth), Some(0.0));

    let after = world.agent(1).unwrap();
    let expected_hunger = (before.needs.hunger + config.physical.hunger).clamp(0.0, 1.0);
    let expected_thirst = (before.needs.thirst + config.physical.thirst).clamp(0.0, 1.0);
    assert!((after.needs.hunger - expected_hunger).abs() < 1e-6);
    assert!((after.needs.thirst - expected_thirst).abs() < 1e-6);

    let alpha = delta.factions.iter().find(|f| f.name == "Alpha").unwrap();
    assert!((alpha.power_before - 0.48).abs() < 1e-6);
    assert!((alpha.power_after - 0.42).abs() < 1e-6);
    assert_eq!(delta.intervention.as_deref(), Some("iv-1"));
    assert_eq!(world.interventions_at(4).len(), 1);
}

#[test]
fn invariant_violation_leaves_world_unchanged() {
    let mut config = SimConfig::default();
    config.physical.hunger = f32::NAN;
    let mut world = world_at_turn_three();
    let hunger = world.agent(1).unwrap().needs.hunger;

    let mut turns = TurnOrchestrator::new(config);
    let err = turns.advance(&mut world, Some(&reduce_wealth("iv-1"))).unwrap_err();

    assert!(matches!(err, SimError::InvariantViolation(_)));
    assert_eq!(world.turn, 3);
    assert_eq!(world.agent(1).unwrap().needs.hunger, hunger);
    assert_eq!(world.factions["Alpha"].value(FactionField::Wealth), Some(80.0));
    assert!(!world.intervention_applied("iv-1"));
}

#[test]
fn invalid_tuning_rejected_up_front() {
    let mut config = SimConfig::default();
    config.physical.hunger = f32::NAN;
    assert!(matches!(TurnOrchestrator::validated(config), Err(SimError::Validation(_))));
}

// ── Engine ─────────────────────────────────────────────────────────────

#[test]
fn repeated_intervention_is_rejected() {
    let engine = SimulationEngine::new(InMemoryStore::new(), Chronicler, SimConfig::default()).unwrap();
    let world = engine.create_world(1, "Aster", 3, setup()).unwrap();
    let faction = world.factions.keys().next().unwrap().clone();
    let iv = Intervention::new("decree-1").with_faction_change(faction, FactionField::Wealth, -5.0);

    engine.advance_turn(1, Some(iv.clone())).unwrap();
    let err = engine.advance_turn(1, Some(iv.clone())).unwrap_err();

    assert!(matches!(err, SimError::Conflict(ConflictKind::AlreadyApplied(ref id)) if id == "decree-1"));
    assert_eq!(engine.world(1).unwrap().turn, 1);
    assert_eq!(engine.store().decision(1, 1).unwrap(), Some(iv));
}

#[test]
fn narrator_failure_keeps_committed_turn() {
    let narrator = FlakyNarrator {
        failing: AtomicBool::new(true),
    };
    let engine = SimulationEngine::new(InMemoryStore::new(), narrator, SimConfig::default()).unwrap();
    engine.create_world(1, "Aster", 3, setup()).unwrap();

    let outcome = engine.advance_turn(1, None).unwrap();
    assert!(matches!(outcome.narrative, NarrativeOutcome::Pending(_)));
    assert_eq!(engine.world(1).unwrap().turn, 1);
    let record = engine.store().event(1, 1).unwrap().unwrap();
    assert!(matches!(record.narrative, NarrativeStatus::Pending { .. }));

    assert!(matches!(engine.retry_narrative(1, 1), Err(SimError::ExternalUnavailable(_))));

    engine.narrator().failing.store(false, Ordering::SeqCst);
    engine.retry_narrative(1, 1).unwrap();
    let record = engine.store().event(1, 1).unwrap().unwrap();
    assert!(matches!(record.narrative, NarrativeStatus::Ready(_)));
    assert_eq!(engine.world(1).unwrap().turn, 1);
}

#[test]
fn concurrent_turn_request_conflicts() {
    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let narrator = GatedNarrator {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let engine = Arc::new(SimulationEngine::new(InMemoryStore::new(), narrator, SimConfig::default()).unwrap());
    engine.create_world(1, "Aster", 3, setup()).unwrap();

    let first = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.advance_turn(1, None))
    };
    entered_rx.recv().unwrap();

    let err = engine.advance_turn(1, None).unwrap_err();
    assert!(matches!(err, SimError::Conflict(ConflictKind::TurnInProgress(1))));

    release_tx.send(()).unwrap();
    let outcome = first.join().unwrap().unwrap();
    assert_eq!(outcome.turn, 1);
    assert_eq!(engine.world(1).unwrap().turn, 1);
}

#[test]
fn unavailable_store_surfaces_as_external_error() {
    let engine = SimulationEngine::new(InMemoryStore::new(), Chronicler, SimConfig::default()).unwrap();
    engine.create_world(1, "Aster", 3, setup()).unwrap();
    engine.store().set_available(false);
    assert!(matches!(engine.advance_turn(1, None), Err(SimError::ExternalUnavailable(_))));
    engine.store().set_available(true);
    assert_eq!(engine.world(1).unwrap().turn, 0);
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn snapshot_survives_save_load() {
    let config = SimConfig::default();
    let mut world = genesis(1, "Aster", 17, setup(), &GenesisOptions::default(), &config).unwrap();
    let mut turns = TurnOrchestrator::new(config);
    for _ in 0..3 {
        turns.advance(&mut world, None).unwrap();
    }

    let mut bytes = Vec::new();
    save_world(&mut bytes, &world).unwrap();
    let loaded = load_world(bytes.as_slice()).unwrap();

    assert_eq!(loaded.turn, 3);
    assert_eq!(loaded.population(), world.population());
    assert_eq!(loaded.factions, world.factions);
    let mut again = Vec::new();
    save_world(&mut again, &loaded).unwrap();
    assert_eq!(bytes, again);

    // The loaded world keeps advancing exactly like the original.
    let mut a = world;
    let mut b = loaded;
    turns.advance(&mut a, None).unwrap();
    turns.advance(&mut b, None).unwrap();
    let hunger = |w: &WorldState| w.agents().map(|x| x.needs.hunger).collect::<Vec<_>>();
    assert_eq!(hunger(&a), hunger(&b));
}
