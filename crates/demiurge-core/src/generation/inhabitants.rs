//! Inhabitant generation: founding population, kinship, and births.

use demiurge_logic::agent::{Agent, AgentId, Cognition, Personality, Turn};
use demiurge_logic::common::Vec3;
use demiurge_logic::config::SimConfig;
use demiurge_logic::goals::{Goal, GoalKind};
use demiurge_logic::memory::{self, Memory, MemoryKind};
use demiurge_logic::relationship::{establish, RelationshipKind};
use demiurge_logic::skills::Skill;
use rand::Rng;

use super::names::generate_name;
use crate::error::SimError;
use crate::world::{Region, WorldState};

static SKILLS: &[&str] = &[
    "farming", "smithing", "healing", "lore", "hunting", "trade", "masonry", "song",
];

/// Personality with every trait drawn uniformly from [0, 1].
pub fn random_personality(rng: &mut impl Rng) -> Personality {
    Personality {
        openness: rng.gen_range(0.0..=1.0),
        conscientiousness: rng.gen_range(0.0..=1.0),
        extraversion: rng.gen_range(0.0..=1.0),
        agreeableness: rng.gen_range(0.0..=1.0),
        neuroticism: rng.gen_range(0.0..=1.0),
        curiosity: rng.gen_range(0.0..=1.0),
        courage: rng.gen_range(0.0..=1.0),
        empathy: rng.gen_range(0.0..=1.0),
        ambition: rng.gen_range(0.0..=1.0),
        spirituality: rng.gen_range(0.0..=1.0),
    }
}

/// Mean of the parents' traits, nudged by a little noise.
fn inherited_personality(parents: &[Personality], rng: &mut impl Rng) -> Personality {
    if parents.is_empty() {
        return random_personality(rng);
    }
    let n = parents.len() as f32;
    let mut mean = |f: fn(&Personality) -> f32| {
        let avg = parents.iter().map(f).sum::<f32>() / n;
        (avg + rng.gen_range(-0.1..=0.1)).clamp(0.0, 1.0)
    };
    Personality {
        openness: mean(|p| p.openness),
        conscientiousness: mean(|p| p.conscientiousness),
        extraversion: mean(|p| p.extraversion),
        agreeableness: mean(|p| p.agreeableness),
        neuroticism: mean(|p| p.neuroticism),
        curiosity: mean(|p| p.curiosity),
        courage: mean(|p| p.courage),
        empathy: mean(|p| p.empathy),
        ambition: mean(|p| p.ambition),
        spirituality: mean(|p| p.spirituality),
    }
}

fn random_cognition(rng: &mut impl Rng) -> Cognition {
    Cognition {
        intelligence: rng.gen_range(0.2..0.9),
        wisdom: rng.gen_range(0.1..0.8),
        memory_capacity: rng.gen_range(48..=96),
        attention_span: rng.gen_range(5..=9),
        processing_speed: rng.gen_range(0.3..0.8),
    }
}

/// Goals suggested by an agent's strongest traits.
fn founding_goals(personality: &Personality, turn: Turn) -> Vec<Goal> {
    let mut goals = vec![Goal::new(GoalKind::Survive, "see the next season", 0.5, turn)];
    if personality.ambition > 0.6 {
        goals.push(Goal::new(GoalKind::Power, "rise within the faction", personality.ambition, turn));
    }
    if personality.spirituality > 0.6 {
        goals.push(Goal::new(GoalKind::Faith, "serve the faith", personality.spirituality, turn));
    }
    if personality.curiosity > 0.6 {
        goals.push(Goal::new(GoalKind::Explore, "see beyond the home region", personality.curiosity, turn));
    }
    if goals.len() == 1 {
        goals.push(Goal::new(GoalKind::Craft, "master a trade", 0.4, turn));
    }
    goals
}

/// Build one agent. Does not insert it into the world.
pub fn spawn(
    id: AgentId,
    name: String,
    species: &str,
    region: Option<&Region>,
    personality: Personality,
    turn: Turn,
    rng: &mut impl Rng,
) -> Agent {
    let mut agent = Agent::new(id, name, species, turn, personality)
        .with_cognition(random_cognition(rng))
        .with_life_expectancy(rng.gen_range(600..1200));

    if let Some(region) = region {
        agent = agent.with_birth_location(region.name.clone());
        agent.physical.position = region.center + Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), 0.0);
        agent.behavior.activity_location = region.name.clone();
    }
    agent.physical.height = rng.gen_range(1.4..2.0);
    agent.physical.weight = rng.gen_range(45.0..100.0);

    let first = SKILLS[rng.gen_range(0..SKILLS.len())];
    agent.skills.insert(first, Skill::new(rng.gen_range(0.2..0.6), rng.gen_range(0.0..=1.0), turn));
    if rng.gen_bool(0.5) {
        let second = SKILLS[rng.gen_range(0..SKILLS.len())];
        agent.skills.insert(second, Skill::new(rng.gen_range(0.0..0.3), rng.gen_range(0.0..=1.0), turn));
    }

    agent.economy.wealth = rng.gen_range(20.0..200.0);
    agent.economy.refresh_tier();

    agent.culture.culture_id = species.to_string();
    agent.culture.languages.push(format!("{species} tongue"));

    for goal in founding_goals(agent.personality(), turn) {
        agent.goals.add(goal);
    }
    agent
}

/// Create the founding population, spreading it across regions and
/// factions in round-robin order.
pub fn populate(world: &mut WorldState, count: usize, rng: &mut impl Rng) -> Result<Vec<AgentId>, SimError> {
    let species = world.setup.species();
    let factions: Vec<String> = world.factions.keys().cloned().collect();
    let mut created = Vec::with_capacity(count);

    for i in 0..count {
        let id = world.allocate_agent_id();
        let region = world.regions.get(i % world.regions.len().max(1)).cloned();
        let mut agent = spawn(
            id,
            generate_name(rng),
            &species[i % species.len()],
            region.as_ref(),
            random_personality(rng),
            world.turn,
            rng,
        );
        if let Some(faction) = factions.get(i % factions.len().max(1)) {
            agent = agent.with_faction(faction.clone());
            if let Some(f) = world.factions.get_mut(faction) {
                f.members.push(id);
            }
        }
        world.insert_agent(agent)?;
        created.push(id);
    }
    Ok(created)
}

/// Group agents of the same species into small families and give everyone
/// at least one acquaintance.
pub fn weave_ties(world: &mut WorldState, ids: &[AgentId], rng: &mut impl Rng) -> Result<(), SimError> {
    let turn = world.turn;
    let mut by_species: std::collections::BTreeMap<String, Vec<AgentId>> = Default::default();
    for id in ids {
        let agent = world.require_agent(*id)?;
        by_species.entry(agent.identity.species.clone()).or_default().push(*id);
    }

    for members in by_species.values() {
        for family in members.chunks(3) {
            for (i, a) in family.iter().enumerate() {
                for b in &family[i + 1..] {
                    if let Some((x, y)) = world.pair_mut(*a, *b) {
                        establish(x, y, RelationshipKind::Family, turn)?;
                    }
                }
            }
        }
    }

    if ids.len() < 2 {
        return Ok(());
    }
    for (i, a) in ids.iter().enumerate() {
        let b = ids[(i + rng.gen_range(1..ids.len())) % ids.len()];
        if let Some((x, y)) = world.pair_mut(*a, b) {
            if x.relationship(b).is_none() {
                establish(x, y, RelationshipKind::Acquaintance, turn)?;
            }
        }
    }
    Ok(())
}

/// Bring a new agent into the world. With parents, the child inherits
/// their species, blended personality and first parent's faction, and
/// family ties are formed with each parent; without, the child is drawn
/// fresh from the setup's species.
pub fn birth(
    world: &mut WorldState,
    parents: &[AgentId],
    name: Option<String>,
    turn: Turn,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Result<AgentId, SimError> {
    let mut traits = Vec::with_capacity(parents.len());
    let mut species = None;
    let mut faction = None;
    let mut location = None;
    for id in parents {
        let parent = world.require_agent(*id)?;
        traits.push(*parent.personality());
        species.get_or_insert_with(|| parent.identity.species.clone());
        if faction.is_none() {
            faction = parent.faction.clone();
        }
        location.get_or_insert_with(|| parent.behavior.activity_location.clone());
    }
    let species = match species {
        Some(s) => s,
        None => {
            let all = world.setup.species();
            all[rng.gen_range(0..all.len())].clone()
        }
    };
    let region = location
        .and_then(|l| world.regions.iter().find(|r| r.name == l).cloned())
        .or_else(|| {
            (!world.regions.is_empty()).then(|| world.regions[rng.gen_range(0..world.regions.len())].clone())
        });

    let id = world.allocate_agent_id();
    let name = name.unwrap_or_else(|| generate_name(rng));
    let personality = inherited_personality(&traits, rng);
    let mut child = spawn(id, name.clone(), &species, region.as_ref(), personality, turn, rng);
    child.economy.wealth = 0.0;
    child.economy.refresh_tier();
    if let Some(faction) = faction {
        if let Some(f) = world.factions.get_mut(&faction) {
            f.members.push(id);
        }
        child = child.with_faction(faction);
    }
    world.insert_agent(child)?;

    for parent in parents {
        if let Some((p, c)) = world.pair_mut(*parent, id) {
            establish(p, c, RelationshipKind::Family, turn)?;
            let record = Memory::new(MemoryKind::Birth, turn, format!("{name} was born"), 0.8)
                .with_participants(vec![id])
                .with_impact(0.7);
            memory::record(p, record, &config.memory)?;
        }
    }
    log::info!("agent {id} ({name}, {species}) born on turn {turn}");
    Ok(id)
}
