//! Generation - procedural creation of a world from its setup answers.
//!
//! All randomness flows from one `StdRng` seeded with the world seed, so the
//! same seed and setup always produce the same world.

mod inhabitants;
mod names;
mod realm;

pub use inhabitants::{birth, random_personality, spawn};
pub use names::generate_name;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use demiurge_logic::config::SimConfig;
use demiurge_logic::goals;

use crate::error::SimError;
use crate::setup::SetupConfig;
use crate::world::{WorldId, WorldState};

/// Size of a freshly created world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisOptions {
    pub population: usize,
    pub factions: usize,
}

impl Default for GenesisOptions {
    fn default() -> Self {
        Self {
            population: 24,
            factions: 3,
        }
    }
}

/// Create a world at turn 0 from validated setup answers.
pub fn genesis(
    id: WorldId,
    name: impl Into<String>,
    seed: u64,
    setup: SetupConfig,
    options: &GenesisOptions,
    config: &SimConfig,
) -> Result<WorldState, SimError> {
    setup.validate()?;
    if options.population == 0 {
        return Err(SimError::Validation("population must be at least 1".into()));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = WorldState::new(id, name, seed, setup);

    world.regions = realm::regions(&world.setup, &mut rng);
    for faction in realm::factions(options.factions, &world.setup, &mut rng) {
        world.factions.insert(faction.name.clone(), faction);
    }

    let ids = inhabitants::populate(&mut world, options.population, &mut rng)?;
    inhabitants::weave_ties(&mut world, &ids, &mut rng)?;

    let mut faith = realm::founding_faith(&world.setup);
    for id in &ids {
        let agent = world.require_agent_mut(*id)?;
        let devotion = agent.personality().spirituality;
        agent.culture.beliefs.insert(faith.name.clone(), devotion);
        if devotion > 0.5 {
            faith.adherents.push(*id);
        }
        goals::update(agent, 0, &config.goals);
    }
    world.belief_systems.push(faith);

    let creator = world.setup.supreme_being.identity.clone();
    let event = format!("{} was shaped by {creator}", world.name);
    world.record_major_event(0, event);
    world.setup_complete = true;

    world.validate()?;
    log::info!(
        "world {} created: {} agents, {} factions, {} regions",
        world.id,
        world.population(),
        world.factions.len(),
        world.regions.len()
    );
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SetupConfig {
        serde_json::from_str(include_str!("../../../../data/setup_example.json")).unwrap()
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let config = SimConfig::default();
        let a = genesis(1, "Aster", 42, setup(), &GenesisOptions::default(), &config).unwrap();
        let b = genesis(1, "Aster", 42, setup(), &GenesisOptions::default(), &config).unwrap();
        let names = |w: &WorldState| w.agents().map(|x| x.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.factions.keys().collect::<Vec<_>>(), b.factions.keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_genesis_populates_world() {
        let world = genesis(1, "Aster", 7, setup(), &GenesisOptions::default(), &SimConfig::default()).unwrap();
        assert_eq!(world.turn, 0);
        assert!(world.setup_complete);
        assert_eq!(world.population(), 24);
        assert_eq!(world.factions.len(), 3);
        assert_eq!(world.belief_systems.len(), 1);
        let members: usize = world.factions.values().map(|f| f.members.len()).sum();
        assert_eq!(members, 24);
        assert!(world.agents().all(|a| !a.relationships().is_empty()));
    }

    #[test]
    fn test_genesis_rejects_incomplete_setup() {
        let mut incomplete = setup();
        incomplete.inhabitants.clear();
        let result = genesis(1, "Aster", 7, incomplete, &GenesisOptions::default(), &SimConfig::default());
        assert!(matches!(result, Err(SimError::Validation(_))));
    }
}
