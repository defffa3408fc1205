//! Turn orchestrator - resolves an intervention, advances every agent, then
//! the world, and commits.
//!
//! A turn runs on a staged clone of the world. The caller's world is only
//! replaced after every invariant has been checked, so any failure leaves it
//! exactly as it was.
//!
//! ```
//! use demiurge_core::generation::{genesis, GenesisOptions};
//! use demiurge_core::setup::SetupConfig;
//! use demiurge_core::turn::TurnOrchestrator;
//! use demiurge_logic::config::SimConfig;
//!
//! let setup = SetupConfig::from_json(r#"{
//!     "worldType": "islands",
//!     "supremeBeing": {"identity": "The Tide", "purpose": "to renew"},
//!     "creationRules": {"timeFlow": "linear", "deathPermanence": "permanent",
//!                       "natureStability": "calm", "moralFramework": "balance"},
//!     "inhabitants": "humans",
//!     "simulationSpeed": "normal"
//! }"#).unwrap();
//! let mut world = genesis(1, "Aster", 42, setup, &GenesisOptions::default(), &SimConfig::default()).unwrap();
//! let mut turns = TurnOrchestrator::new(SimConfig::default());
//! let delta = turns.advance(&mut world, None).unwrap();
//! assert_eq!((world.turn, delta.turn), (1, 1));
//! ```

use std::collections::BTreeSet;

use demiurge_logic::agent::{AgentId, Turn};
use demiurge_logic::common::unit;
use demiurge_logic::config::SimConfig;
use demiurge_logic::crossings;
use demiurge_logic::decay::{advance_agent, choose_activity};
use demiurge_logic::goals;
use demiurge_logic::health::{cause_of_death, grief_impact};
use demiurge_logic::memory::{self, Memory, MemoryKind};
use demiurge_logic::relationship::{self, RelationshipKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::delta::{Death, FactionDelta, WorldDelta};
use crate::error::SimError;
use crate::generation;
use crate::intervention::{self, Intervention};
use crate::setup::DeathPermanence;
use crate::world::WorldState;

/// Need level below which a need counts as critical in the delta.
pub const CRITICAL_NEED: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Resolving,
    Advancing,
    AdvancingWorld,
    Committed,
}

/// Per-turn generator derived from the world seed and the turn number.
pub fn turn_rng(seed: u64, turn: Turn) -> StdRng {
    StdRng::seed_from_u64(seed ^ turn.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub struct TurnOrchestrator {
    config: SimConfig,
    phase: TurnPhase,
}

impl TurnOrchestrator {
    /// Build an orchestrator around `config` as given.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            phase: TurnPhase::Idle,
        }
    }

    /// Build an orchestrator, rejecting out-of-range tuning first.
    pub fn validated(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Phase reached by the most recent turn. `Committed` after success;
    /// after a failure, the phase in which it failed.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    fn enter(&mut self, phase: TurnPhase, turn: Turn) {
        log::debug!("turn {turn}: {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    /// Run one turn and replace `world` with the result on success.
    pub fn advance(
        &mut self,
        world: &mut WorldState,
        intervention: Option<&Intervention>,
    ) -> Result<WorldDelta, SimError> {
        let (next, delta) = self.run(world, intervention)?;
        *world = next;
        Ok(delta)
    }

    /// Run one turn against a staged copy of `world`, returning the next
    /// world and its delta. `world` itself is never modified.
    pub fn run(
        &mut self,
        world: &WorldState,
        intervention: Option<&Intervention>,
    ) -> Result<(WorldState, WorldDelta), SimError> {
        if !world.setup_complete {
            return Err(SimError::Validation(format!("world {} has not finished setup", world.id)));
        }
        self.phase = TurnPhase::Idle;
        let now = world.turn + 1;
        let mut staged = world.clone();
        let mut rng = turn_rng(world.seed, now);
        let mut delta = WorldDelta {
            turn: now,
            intervention: intervention.map(|iv| iv.id.clone()),
            ..WorldDelta::default()
        };

        // Resolving: the intervention, then births owed by the cycle of death
        self.enter(TurnPhase::Resolving, now);
        if let Some(iv) = intervention {
            let applied = intervention::apply(&mut staged, iv, now, &self.config, &mut rng)?;
            delta.births.extend(applied.births);
            delta.events.extend(applied.events);
        }
        for _ in 0..std::mem::take(&mut staged.pending_births) {
            let id = generation::birth(&mut staged, &[], None, now, &self.config, &mut rng)?;
            delta.births.push(id);
        }

        // Advancing: every living agent, ascending id
        self.enter(TurnPhase::Advancing, now);
        let deaths = self.advance_agents(&mut staged, now)?;
        self.mourn(&mut staged, &deaths, now)?;
        for id in staged.living_ids() {
            let agent = staged.require_agent_mut(id)?;
            let activity = choose_activity(agent, now);
            let location = agent.behavior.activity_location.clone();
            agent.behavior.begin(activity, now, location);
        }
        if staged.rules.death == DeathPermanence::Cyclical {
            staged.pending_births = deaths.len() as u32;
        }
        for death in &deaths {
            staged.record_major_event(now, format!("{} died ({:?})", death.name, death.cause));
        }
        delta.deaths = deaths;

        // AdvancingWorld: calendar, weather, ecosystem
        self.enter(TurnPhase::AdvancingWorld, now);
        let (temp_roll, kind_roll) = (rng.gen::<f32>(), rng.gen::<f32>());
        staged.environment.advance(temp_roll, kind_roll);

        // Committed: validate, then bump the counter
        if let Err(breach) = staged.validate() {
            log::error!("turn {now} of world {} aborted: {breach}", world.id);
            return Err(breach.into());
        }
        staged.turn = now;
        self.enter(TurnPhase::Committed, now);

        delta.environment = staged.environment.summary();
        delta.factions = staged
            .factions
            .values()
            .map(|after| FactionDelta::between(world.factions.get(&after.name), after))
            .collect();
        for after in staged.agents() {
            if let Some(before) = world.agent(after.id()) {
                delta.crossings.extend(crossings::detect(before, after, CRITICAL_NEED));
            }
        }
        Ok((staged, delta))
    }

    fn advance_agents(&self, world: &mut WorldState, now: Turn) -> Result<Vec<Death>, SimError> {
        let config = &self.config;
        let ticks = world.rules.ticks_per_turn;
        let ambient = world.environment.ambient();
        let living: BTreeSet<AgentId> = world.living_ids().into_iter().collect();
        let mut deaths = Vec::new();

        for id in &living {
            let agent = world.require_agent_mut(*id)?;
            advance_agent(agent, ticks, &ambient, config);
            agent.skills.decay_unused(now, ticks, &config.skills);
            agent.economy.settle();
            memory::decay_all(agent, ticks, now, &config.memory);
            relationship::maintain(agent, now, ticks, |other| living.contains(&other), &config.relationships);
            goals::update(agent, now, &config.goals);

            if let Some(cause) = cause_of_death(&agent.needs, agent.age(now), agent.life_expectancy) {
                agent.die(now, cause);
                log::info!("agent {id} ({}) died on turn {now}: {cause:?}", agent.name());
                deaths.push(Death {
                    agent: *id,
                    name: agent.name().to_string(),
                    cause,
                });
            }
        }
        Ok(deaths)
    }

    /// Survivors who knew the dead grieve and remember the loss.
    fn mourn(&self, world: &mut WorldState, deaths: &[Death], now: Turn) -> Result<(), SimError> {
        let (close, distant) = grief_impact();
        for death in deaths {
            for id in world.living_ids() {
                let agent = world.require_agent_mut(id)?;
                let Some(kind) = agent.relationship(death.agent).map(|r| r.kind) else {
                    continue;
                };
                let is_close = matches!(
                    kind,
                    RelationshipKind::Family | RelationshipKind::Partner | RelationshipKind::CloseFriend
                );
                let (sadness, importance) = if is_close { (close, 0.8) } else { (distant, 0.4) };
                agent.emotions.sadness = unit(agent.emotions.sadness + sadness);
                let record = Memory::new(MemoryKind::Loss, now, format!("{} died", death.name), importance)
                    .with_participants(vec![death.agent])
                    .with_impact(-sadness);
                memory::record(agent, record, &self.config.memory)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{genesis, GenesisOptions};
    use crate::setup::SetupConfig;
    use demiurge_logic::agent::{Activity, DeathCause};

    fn world() -> WorldState {
        let setup = SetupConfig::from_json(include_str!("../../../data/setup_example.json")).unwrap();
        genesis(1, "Aster", 11, setup, &GenesisOptions::default(), &SimConfig::default()).unwrap()
    }

    #[test]
    fn test_turn_increments_once() {
        let mut w = world();
        let mut turns = TurnOrchestrator::new(SimConfig::default());
        turns.advance(&mut w, None).unwrap();
        turns.advance(&mut w, None).unwrap();
        assert_eq!(w.turn, 2);
        assert_eq!(turns.phase(), TurnPhase::Committed);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let mut a = world();
        let mut b = world();
        let mut turns = TurnOrchestrator::new(SimConfig::default());
        for _ in 0..5 {
            turns.advance(&mut a, None).unwrap();
            turns.advance(&mut b, None).unwrap();
        }
        assert_eq!(a.environment.weather, b.environment.weather);
        let hunger = |w: &WorldState| w.agents().map(|x| x.needs.hunger).collect::<Vec<_>>();
        assert_eq!(hunger(&a), hunger(&b));
    }

    #[test]
    fn test_unfinished_setup_rejected() {
        let mut w = world();
        w.setup_complete = false;
        let mut turns = TurnOrchestrator::new(SimConfig::default());
        assert!(matches!(turns.advance(&mut w, None), Err(SimError::Validation(_))));
        assert_eq!(w.turn, 0);
    }

    #[test]
    fn test_death_grieves_family_and_schedules_rebirth() {
        let mut w = world();
        let victim = w.agent_ids()[0];
        let mourner = *w
            .agent(victim)
            .unwrap()
            .relationships()
            .iter()
            .find(|(_, r)| r.kind == RelationshipKind::Family)
            .unwrap()
            .0;
        w.agent_mut(victim).unwrap().life_expectancy = 0;
        let population = w.population();

        let mut turns = TurnOrchestrator::new(SimConfig::default());
        let delta = turns.advance(&mut w, None).unwrap();
        assert_eq!(delta.deaths.len(), 1);
        assert!(matches!(
            w.agent(victim).unwrap().vitality,
            demiurge_logic::agent::Vitality::Deceased { cause: DeathCause::OldAge, .. }
        ));
        let losses = w
            .agent(mourner)
            .unwrap()
            .memory
            .involving(victim)
            .filter(|m| m.kind == MemoryKind::Loss)
            .count();
        assert_eq!(losses, 1);
        let behavior = &w.agent(mourner).unwrap().behavior;
        assert!(matches!(behavior.activity, Activity::Mourning | Activity::Recovering));
        assert_eq!(behavior.activity_started, 1);
        assert_eq!(w.pending_births, 1);

        let delta = turns.advance(&mut w, None).unwrap();
        assert_eq!(delta.births.len(), 1);
        assert_eq!(w.population(), population + 1);
        assert_eq!(w.pending_births, 0);
    }
}
