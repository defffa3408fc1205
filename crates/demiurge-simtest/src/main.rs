//! Demiurge Headless Simulation Harness
//!
//! Runs whole worlds through the engine with the in-process store and the
//! local chronicler. No external narrator, no database, no networking.
//!
//! Usage:
//!   cargo run -p demiurge-simtest
//!   cargo run -p demiurge-simtest -- --verbose

use demiurge_core::engine::{NarrativeOutcome, SimulationEngine};
use demiurge_core::error::{ConflictKind, SimError};
use demiurge_core::generation::{genesis, GenesisOptions};
use demiurge_core::intervention::{EnvironmentChange, Intervention};
use demiurge_core::narrative::{Chronicler, NarrativeResponse};
use demiurge_core::persistence::{load_world, save_world, InMemoryStore, NarrativeStatus, WorldStore};
use demiurge_core::setup::SetupConfig;
use demiurge_core::turn::TurnOrchestrator;
use demiurge_core::world::WorldState;
use demiurge_logic::config::SimConfig;
use demiurge_logic::faction::FactionField;

// ── Data files (same JSON the engine ships with) ────────────────────────
const SETUP_JSON: &str = include_str!("../../../data/setup_example.json");
const TUNING_JSON: &str = include_str!("../../../data/tuning.json");

const SEED: u64 = 0xD3A1;
const LONG_RUN: u64 = 60;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }

    fn failed(name: &str, err: impl std::fmt::Display) -> Self {
        Self::new(name, false, err.to_string())
    }
}

type Engine = SimulationEngine<InMemoryStore, Chronicler>;

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Demiurge Simulation Harness ===\n");

    let mut results = Vec::new();

    let (setup, config) = match load_data(&mut results) {
        Some(data) => data,
        None => {
            report(&results, verbose);
            std::process::exit(1);
        }
    };

    // 2. Genesis
    results.extend(validate_genesis(&setup, &config, verbose));

    // 3. Long run through the engine
    results.extend(validate_long_run(&setup, &config, verbose));

    // 4. Interventions
    results.extend(validate_interventions(&setup, &config, verbose));

    // 5. Death and rebirth
    results.extend(validate_rebirth(&setup, &config, verbose));

    // 6. Narrator round trip
    results.extend(validate_narrator_choices(&setup, &config, verbose));

    // 7. Determinism and persistence
    results.extend(validate_determinism(&setup, &config, verbose));

    report(&results, verbose);
    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
}

fn report(results: &[TestResult], verbose: bool) {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!("\n=== RESULT: {}/{} passed, {} failed ===", passed, results.len(), failed);
}

fn engine(config: &SimConfig) -> Result<Engine, SimError> {
    SimulationEngine::new(InMemoryStore::new(), Chronicler, config.clone())
}

// ── 1. Data files ───────────────────────────────────────────────────────

fn load_data(results: &mut Vec<TestResult>) -> Option<(SetupConfig, SimConfig)> {
    println!("--- Data Files ---");

    let setup = match SetupConfig::from_json(SETUP_JSON) {
        Ok(setup) => setup,
        Err(e) => {
            results.push(TestResult::failed("setup_parse", e));
            return None;
        }
    };
    results.push(TestResult::new("setup_parse", true, format!("world type \"{}\"", setup.world_type)));

    let species = setup.species();
    results.push(TestResult::new(
        "setup_species",
        !species.is_empty(),
        format!("species: {}", species.join(", ")),
    ));

    let config = match demiurge_core::config::from_json(TUNING_JSON) {
        Ok(config) => config,
        Err(e) => {
            results.push(TestResult::failed("tuning_parse", e));
            return None;
        }
    };
    results.push(TestResult::new("tuning_parse", true, "tuning parsed and validated"));

    // Every section the engine knows about is spelled out in the file
    let sections = |value: serde_json::Value| -> Vec<String> {
        value.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default()
    };
    let expected = serde_json::to_value(SimConfig::default()).map(sections).unwrap_or_default();
    let present = serde_json::from_str(TUNING_JSON).map(sections).unwrap_or_default();
    let missing: Vec<_> = expected.iter().filter(|k| !present.contains(k)).cloned().collect();
    results.push(TestResult::new(
        "tuning_complete",
        !expected.is_empty() && missing.is_empty(),
        if missing.is_empty() {
            format!("{} sections present", present.len())
        } else {
            format!("missing sections: {}", missing.join(", "))
        },
    ));

    let mut broken = config.clone();
    broken.physical.hunger = f32::NAN;
    results.push(TestResult::new(
        "tuning_rejects_nan",
        broken.validate().is_err(),
        "NaN decay rate rejected",
    ));

    Some((setup, config))
}

// ── 2. Genesis ──────────────────────────────────────────────────────────

fn validate_genesis(setup: &SetupConfig, config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Genesis ---");
    let mut results = Vec::new();

    let options = GenesisOptions::default();
    let world = match genesis(1, "Aster", SEED, setup.clone(), &options, config) {
        Ok(world) => world,
        Err(e) => return vec![TestResult::failed("genesis", e)],
    };

    results.push(TestResult::new(
        "genesis_population",
        world.population() == options.population,
        format!("{} agents", world.population()),
    ));
    results.push(TestResult::new(
        "genesis_factions",
        world.factions.len() == options.factions,
        format!("{} factions", world.factions.len()),
    ));
    results.push(TestResult::new(
        "genesis_regions",
        world.regions.len() >= 3,
        format!("{} regions", world.regions.len()),
    ));
    results.push(TestResult::new(
        "genesis_faith",
        world.belief_systems.len() == 1,
        world
            .belief_systems
            .first()
            .map(|b| format!("{} ({} adherents)", b.name, b.adherents.len()))
            .unwrap_or_else(|| "no belief system".into()),
    ));

    let unaffiliated = world.agents().filter(|a| a.faction.is_none()).count();
    results.push(TestResult::new(
        "genesis_affiliation",
        unaffiliated == 0,
        format!("{unaffiliated} agents without a faction"),
    ));

    let lonely = world.agents().filter(|a| a.relationships().is_empty()).count();
    results.push(TestResult::new(
        "genesis_ties",
        lonely == 0,
        format!("{lonely} agents without any relationship"),
    ));

    let goalless = world.agents().filter(|a| a.goals.is_empty()).count();
    results.push(TestResult::new(
        "genesis_goals",
        goalless == 0,
        format!("{goalless} agents without goals"),
    ));

    results.push(TestResult::new(
        "genesis_invariants",
        world.validate().is_ok(),
        "world passes validation",
    ));

    if verbose {
        println!("  Factions:");
        for faction in world.factions.values() {
            println!("    {:20} {:?} ({} members)", faction.name, faction.shape(), faction.members.len());
        }
    }

    let mut empty = GenesisOptions::default();
    empty.population = 0;
    results.push(TestResult::new(
        "genesis_rejects_empty",
        matches!(genesis(2, "Void", SEED, setup.clone(), &empty, config), Err(SimError::Validation(_))),
        "zero population rejected",
    ));

    results
}

// ── 3. Long run ─────────────────────────────────────────────────────────

fn validate_long_run(setup: &SetupConfig, config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Long Run ({LONG_RUN} turns) ---");
    let mut results = Vec::new();

    let engine = match engine(config) {
        Ok(engine) => engine,
        Err(e) => return vec![TestResult::failed("run_engine", e)],
    };
    if let Err(e) = engine.create_world(1, "Aster", SEED, setup.clone()) {
        return vec![TestResult::failed("run_create", e)];
    }

    let mut narrated = 0;
    let (mut births, mut deaths) = (0, 0);
    for turn in 1..=LONG_RUN {
        match engine.advance_turn(1, None) {
            Ok(outcome) => {
                if outcome.turn != turn {
                    results.push(TestResult::new(
                        "run_turn_counter",
                        false,
                        format!("expected turn {turn}, got {}", outcome.turn),
                    ));
                    return results;
                }
                if matches!(outcome.narrative, NarrativeOutcome::Ready(_)) {
                    narrated += 1;
                }
                births += outcome.delta.births.len();
                deaths += outcome.delta.deaths.len();
            }
            Err(e) => {
                results.push(TestResult::failed("run_advance", format!("turn {turn}: {e}")));
                return results;
            }
        }
    }
    results.push(TestResult::new("run_turn_counter", true, format!("{LONG_RUN} turns committed")));
    results.push(TestResult::new(
        "run_narrated",
        narrated == LONG_RUN,
        format!("{narrated}/{LONG_RUN} turns narrated"),
    ));

    let events = (1..=LONG_RUN)
        .filter(|t| matches!(engine.store().event(1, *t), Ok(Some(_))))
        .count() as u64;
    results.push(TestResult::new(
        "run_events_stored",
        events == LONG_RUN,
        format!("{events}/{LONG_RUN} event records"),
    ));

    match engine.world(1) {
        Ok(world) => {
            results.push(TestResult::new(
                "run_invariants",
                world.validate().is_ok(),
                format!("{} living of {}", world.living_population(), world.population()),
            ));
            if verbose {
                println!("  {births} births, {deaths} deaths");
                println!("  {}", world.environment.summary());
            }
        }
        Err(e) => results.push(TestResult::failed("run_invariants", e)),
    }

    match engine.store().snapshot_len(1) {
        Ok(Some(bytes)) => {
            results.push(TestResult::new("run_snapshot_stored", bytes > 0, format!("{bytes} bytes")));
        }
        Ok(None) => results.push(TestResult::new("run_snapshot_stored", false, "no snapshot")),
        Err(e) => results.push(TestResult::failed("run_snapshot_stored", e)),
    }

    match engine.store().current_state(1) {
        Ok(state) => results.push(TestResult::new(
            "run_current_state",
            state.turn == LONG_RUN,
            format!("year {}, {} ({})", state.year, state.season, state.weather),
        )),
        Err(e) => results.push(TestResult::failed("run_current_state", e)),
    }

    results
}

// ── 4. Interventions ────────────────────────────────────────────────────

fn validate_interventions(setup: &SetupConfig, config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Interventions ---");
    let mut results = Vec::new();

    let engine = match engine(config) {
        Ok(engine) => engine,
        Err(e) => return vec![TestResult::failed("iv_engine", e)],
    };
    let world = match engine.create_world(1, "Aster", SEED, setup.clone()) {
        Ok(world) => world,
        Err(e) => return vec![TestResult::failed("iv_create", e)],
    };
    let Some(faction) = world.factions.values().next() else {
        return vec![TestResult::new("iv_faction", false, "world has no factions")];
    };
    let name = faction.name.clone();
    let before = faction.value(FactionField::Military).unwrap_or(0.0);

    let decree = Intervention::new("decree-1")
        .with_description(format!("disband half of {name}'s army"))
        .with_faction_change(name.clone(), FactionField::Military, -20.0)
        .with_environment_change(EnvironmentChange::ShiftBalance(-0.1))
        .with_event("A comet crosses the sky");

    match engine.advance_turn(1, Some(decree.clone())) {
        Ok(outcome) => {
            let after = engine
                .world(1)
                .ok()
                .and_then(|w| w.factions.get(&name).and_then(|f| f.value(FactionField::Military)));
            let expected = (before - 20.0).max(0.0);
            results.push(TestResult::new(
                "iv_faction_change",
                after.is_some_and(|v| (v - expected).abs() < 1e-4),
                format!("{name} military {before:.1} -> {after:?}"),
            ));
            results.push(TestResult::new(
                "iv_event_recorded",
                outcome.delta.events.iter().any(|e| e.contains("comet")),
                format!("{} new events", outcome.delta.events.len()),
            ));
        }
        Err(e) => results.push(TestResult::failed("iv_faction_change", e)),
    }

    let repeat = engine.advance_turn(1, Some(decree.clone()));
    results.push(TestResult::new(
        "iv_applied_once",
        matches!(repeat, Err(SimError::Conflict(ConflictKind::AlreadyApplied(_)))),
        "repeated intervention rejected",
    ));

    let unknown = Intervention::new("decree-2").with_faction_change("Nobody", FactionField::Wealth, 5.0);
    let turn_before = engine.world(1).map(|w| w.turn).unwrap_or_default();
    let rejected = matches!(engine.advance_turn(1, Some(unknown)), Err(SimError::NotFound(_)));
    let turn_after = engine.world(1).map(|w| w.turn).unwrap_or_default();
    results.push(TestResult::new(
        "iv_unknown_faction",
        rejected && turn_before == turn_after,
        format!("turn stays at {turn_after}"),
    ));

    results.push(TestResult::new(
        "iv_decision_logged",
        matches!(engine.store().decision(1, 1), Ok(Some(ref d)) if d.id == "decree-1"),
        "decision stored for turn 1",
    ));

    results
}

// ── 5. Death and rebirth ────────────────────────────────────────────────

fn validate_rebirth(setup: &SetupConfig, config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Death & Rebirth ---");
    let mut results = Vec::new();

    let mut world = match genesis(1, "Aster", SEED, setup.clone(), &GenesisOptions::default(), config) {
        Ok(world) => world,
        Err(e) => return vec![TestResult::failed("rebirth_genesis", e)],
    };
    let doomed: Vec<_> = world.agent_ids().into_iter().take(3).collect();
    for id in &doomed {
        if let Some(agent) = world.agent_mut(*id) {
            agent.life_expectancy = 0;
        }
    }
    let population = world.population();

    let mut turns = TurnOrchestrator::new(config.clone());
    match turns.advance(&mut world, None) {
        Ok(delta) => results.push(TestResult::new(
            "rebirth_deaths",
            delta.deaths.len() == doomed.len() && world.living_population() == population - doomed.len(),
            format!("{} died of old age", delta.deaths.len()),
        )),
        Err(e) => return vec![TestResult::failed("rebirth_deaths", e)],
    }
    results.push(TestResult::new(
        "rebirth_owed",
        world.pending_births as usize == doomed.len(),
        format!("{} births owed", world.pending_births),
    ));

    let mourners = world
        .agents()
        .filter(|a| a.is_alive())
        .filter(|a| doomed.iter().any(|d| a.memory.involving(*d).next().is_some()))
        .count();
    results.push(TestResult::new(
        "rebirth_mourned",
        mourners > 0,
        format!("{mourners} agents remember the dead"),
    ));

    match turns.advance(&mut world, None) {
        Ok(delta) => results.push(TestResult::new(
            "rebirth_delivered",
            delta.births.len() == doomed.len() && world.pending_births == 0,
            format!("{} born, population {}", delta.births.len(), world.population()),
        )),
        Err(e) => results.push(TestResult::failed("rebirth_delivered", e)),
    }

    results
}

// ── 6. Narrator round trip ──────────────────────────────────────────────

const NARRATOR_REPLY: &str = r#"{
    "narrative": {
        "title": "The Dry Season",
        "opening": "The river shrinks between its banks.",
        "situation": "Granaries run low.",
        "stakes": "Hunger will test every oath."
    },
    "choices": [
        {"id": "rain", "text": "Send rain", "icon": "☔"},
        {"id": "silence", "text": "Stay silent"}
    ],
    "worldStateChanges": {
        "environmentChanges": [{"setWeather": "Rain"}],
        "newEvents": ["The rains return"]
    }
}"#;

fn validate_narrator_choices(setup: &SetupConfig, config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Narrator Choices ---");
    let mut results = Vec::new();

    let response = match NarrativeResponse::from_json(NARRATOR_REPLY) {
        Ok(response) => response,
        Err(e) => return vec![TestResult::failed("narrator_parse", e)],
    };
    results.push(TestResult::new(
        "narrator_parse",
        response.choices.len() == 2,
        format!("\"{}\"", response.narrative.text().lines().next().unwrap_or_default()),
    ));

    let engine = match engine(config) {
        Ok(engine) => engine,
        Err(e) => return vec![TestResult::failed("narrator_engine", e)],
    };
    if let Err(e) = engine.create_world(1, "Aster", SEED, setup.clone()) {
        return vec![TestResult::failed("narrator_create", e)];
    }

    let Some(choice) = response.intervention_for(0, "rain") else {
        results.push(TestResult::new("narrator_choice", false, "choice \"rain\" not found"));
        return results;
    };
    match engine.advance_turn(1, Some(choice)) {
        Ok(outcome) => {
            let world = engine.world(1).ok();
            let remembered = world
                .as_ref()
                .map(|w| w.major_events.iter().any(|e| e.description == "The rains return"))
                .unwrap_or(false);
            results.push(TestResult::new(
                "narrator_choice_applied",
                remembered && outcome.delta.intervention.as_deref() == Some("turn-0-rain"),
                format!("turn {} applied turn-0-rain", outcome.turn),
            ));
            let stored = matches!(
                engine.store().event(1, outcome.turn),
                Ok(Some(ref record)) if matches!(record.narrative, NarrativeStatus::Ready(_))
            );
            results.push(TestResult::new("narrator_event_ready", stored, "event stored with narrative"));
        }
        Err(e) => results.push(TestResult::failed("narrator_choice_applied", e)),
    }

    results.push(TestResult::new(
        "narrator_unknown_choice",
        response.intervention_for(0, "flee").is_none(),
        "unknown choice yields nothing",
    ));

    results
}

// ── 7. Determinism & persistence ────────────────────────────────────────

fn run_world(setup: &SetupConfig, config: &SimConfig, turns: u64) -> Result<WorldState, SimError> {
    let mut world = genesis(1, "Aster", SEED, setup.clone(), &GenesisOptions::default(), config)?;
    let mut orchestrator = TurnOrchestrator::new(config.clone());
    for _ in 0..turns {
        orchestrator.advance(&mut world, None)?;
    }
    Ok(world)
}

fn snapshot(world: &WorldState) -> Result<Vec<u8>, SimError> {
    let mut bytes = Vec::new();
    save_world(&mut bytes, world)?;
    Ok(bytes)
}

fn validate_determinism(setup: &SetupConfig, config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Determinism & Persistence ---");
    let mut results = Vec::new();

    let pair = run_world(setup, config, 20).and_then(|a| Ok((a, run_world(setup, config, 20)?)));
    let (a, b) = match pair {
        Ok(pair) => pair,
        Err(e) => return vec![TestResult::failed("determinism_run", e)],
    };

    let (bytes_a, bytes_b) = match (snapshot(&a), snapshot(&b)) {
        (Ok(x), Ok(y)) => (x, y),
        (Err(e), _) | (_, Err(e)) => return vec![TestResult::failed("persistence_save", e)],
    };
    results.push(TestResult::new(
        "determinism_same_seed",
        bytes_a == bytes_b,
        format!("two runs, {} byte snapshots", bytes_a.len()),
    ));

    match load_world(bytes_a.as_slice()).map_err(SimError::from).and_then(|w| snapshot(&w)) {
        Ok(again) => results.push(TestResult::new(
            "persistence_round_trip",
            again == bytes_a,
            "save → load → save is stable",
        )),
        Err(e) => results.push(TestResult::failed("persistence_round_trip", e)),
    }

    if verbose {
        println!("  turn {}: {}", a.turn, a.environment.summary());
    }

    results
}
