//! Integration tests for an agent's life across the logic modules.
//!
//! Exercises: decay → health → memory → relationships → goals → factions
//!
//! All tests are pure logic — no world container, no storage.

use demiurge_logic::agent::{Agent, Personality};
use demiurge_logic::config::SimConfig;
use demiurge_logic::decay::advance_agent;
use demiurge_logic::environment::{Ambient, Season};
use demiurge_logic::faction::{power_score, Faction, FactionStats, LegacyStats};
use demiurge_logic::goals::{self, Goal, GoalKind};
use demiurge_logic::health::{Disease, Injury};
use demiurge_logic::memory::{self, Memory, MemoryKind};
use demiurge_logic::relationship::{interact, InteractionEvent, InteractionKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

fn personality(rng: &mut StdRng) -> Personality {
    Personality {
        openness: rng.gen(),
        conscientiousness: rng.gen(),
        extraversion: rng.gen(),
        agreeableness: rng.gen(),
        neuroticism: rng.gen(),
        curiosity: rng.gen(),
        courage: rng.gen(),
        empathy: rng.gen(),
        ambition: rng.gen(),
        spirituality: rng.gen(),
    }
}

const KINDS: [InteractionKind; 7] = [
    InteractionKind::Conversation,
    InteractionKind::Cooperation,
    InteractionKind::Gift,
    InteractionKind::Romance,
    InteractionKind::SharedHardship,
    InteractionKind::Conflict,
    InteractionKind::Betrayal,
];

// ── Bounded state ──────────────────────────────────────────────────────

#[test]
fn bounded_fields_survive_mixed_sequences() {
    let config = SimConfig::default();
    for seed in 1..=8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut a = Agent::new(1, "Ada", "human", 0, personality(&mut rng));
        let mut b = Agent::new(2, "Bram", "human", 0, personality(&mut rng));

        for turn in 1..200u64 {
            let ambient = Ambient {
                temperature: -20.0 + 60.0 * rng.gen::<f32>(),
                harshness: rng.gen::<f32>(),
                season: Season::Winter,
            };
            let ticks = 1.0 + 4.0 * rng.gen::<f32>();
            advance_agent(&mut a, ticks, &ambient, &config);
            advance_agent(&mut b, ticks, &ambient, &config);

            let roll = rng.gen::<f32>();
            if roll < 0.3 && a.is_alive() && b.is_alive() {
                let kind = KINDS[rng.gen_range(0..KINDS.len())];
                let event = InteractionEvent::new(turn, kind, rng.gen::<f32>());
                interact(&mut a, &mut b, &event, turn, &config).unwrap();
            } else if roll < 0.35 {
                a.health.injuries.push(Injury::new("fall", rng.gen::<f32>(), 0.02));
            } else if roll < 0.4 {
                b.health.diseases.push(Disease::new("ague", rng.gen::<f32>(), 0.03));
            }
            memory::decay_all(&mut a, ticks, turn, &config.memory);
            memory::decay_all(&mut b, ticks, turn, &config.memory);

            a.validate().unwrap();
            b.validate().unwrap();
        }
    }
}

// ── Relationships ──────────────────────────────────────────────────────

#[test]
fn interaction_marks_both_views_with_the_event() {
    let config = SimConfig::default();
    let mut a = Agent::new(10, "Ada", "human", 0, Personality::uniform(0.2));
    let mut b = Agent::new(20, "Bram", "human", 0, Personality::uniform(0.9));

    interact(&mut a, &mut b, &InteractionEvent::new(1, InteractionKind::Conversation, 0.4), 2, &config).unwrap();
    interact(&mut a, &mut b, &InteractionEvent::new(2, InteractionKind::Conflict, 0.9), 6, &config).unwrap();

    let ab = a.relationship(20).unwrap();
    let ba = b.relationship(10).unwrap();
    assert_eq!(ab.last_interaction, 6);
    assert_eq!(ba.last_interaction, 6);
    assert!(ab.shared_experiences.contains(&2));
    assert!(ba.shared_experiences.contains(&2));
    assert_eq!(ab.compatibility, ba.compatibility);
    assert_eq!(a.memory.involving(20).count(), 2);
}

// ── Memory ─────────────────────────────────────────────────────────────

#[test]
fn zero_tick_memory_decay_is_idempotent_on_an_agent() {
    let config = SimConfig::default();
    let mut agent = Agent::new(1, "Ada", "human", 0, Personality::default());
    for t in 0..20u64 {
        let memory = Memory::new(MemoryKind::Witnessed, t, format!("omen {t}"), (t % 7) as f32 / 7.0 + 0.05);
        memory::record(&mut agent, memory, &config.memory).unwrap();
    }
    memory::decay_all(&mut agent, 0.0, 20, &config.memory);
    let snapshot = (agent.memory.working_ids().to_vec(), agent.memory.long_term_ids().to_vec());
    memory::decay_all(&mut agent, 0.0, 20, &config.memory);
    assert_eq!(snapshot.0, agent.memory.working_ids());
    assert_eq!(snapshot.1, agent.memory.long_term_ids());
    assert_eq!(agent.memory.len(), 20);
}

// ── Goals ──────────────────────────────────────────────────────────────

#[test]
fn goal_order_is_deterministic_across_runs() {
    let config = SimConfig::default();
    let run = || {
        let mut agent = Agent::new(1, "Ada", "human", 0, Personality::default());
        for (i, kind) in [GoalKind::Craft, GoalKind::Faith, GoalKind::Craft, GoalKind::Wealth]
            .into_iter()
            .enumerate()
        {
            agent.goals.add(Goal::new(kind, "goal", 0.5, 10 - i as u64));
        }
        goals::update(&mut agent, 12, &config.goals);
        agent.goals.active().iter().map(|g| g.id).collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

// ── Factions ───────────────────────────────────────────────────────────

#[test]
fn legacy_power_matches_reference_value() {
    let alpha = Faction::new(
        "Alpha",
        FactionStats::Legacy(LegacyStats {
            wealth: Some(80.0),
            military: Some(60.0),
            population: Some(2000.0),
        }),
    );
    assert!((power_score(&alpha) - 0.48).abs() < 1e-6);
}

// ── Configuration ──────────────────────────────────────────────────────

#[test]
fn empty_tuning_file_yields_defaults() {
    let config: SimConfig = serde_json::from_str("{}").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.physical.hunger, SimConfig::default().physical.hunger);
}

#[test]
fn out_of_range_tuning_is_rejected() {
    let json = r#"{"goals": {
        "priority_weight": 2.0, "urgency_weight": 0.3, "alignment_weight": 0.3,
        "urgency_growth": 0.01, "deadline_window": 5, "deadline_urgency": 0.8
    }}"#;
    let config: SimConfig = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_err());
}
