//! Interventions — the player's choices and direct acts, applied at the
//! start of a turn.
//!
//! An intervention is validated against the staged world before anything in
//! it is applied: unknown factions and agents fail with `NotFound`, a
//! repeated id fails with `Conflict`, and malformed values fail with
//! `Validation`. Rule failures during application still propagate, but
//! because the turn works on a staged copy the caller's world is untouched.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use demiurge_logic::agent::{AgentId, NeedKind, Turn};
use demiurge_logic::common::in_range;
use demiurge_logic::config::SimConfig;
use demiurge_logic::environment::WeatherKind;
use demiurge_logic::faction::FactionField;
use demiurge_logic::goals::{self, Goal, GoalId, GoalKind};
use demiurge_logic::health::{Disease, Injury};
use demiurge_logic::memory::{self, Memory, MemoryKind};
use demiurge_logic::relationship::{interact, InteractionEvent, InteractionKind};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ConflictKind, SimError};
use crate::generation;
use crate::world::WorldState;

/// Importance of the memory every living agent keeps of a world event.
const WITNESS_IMPORTANCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterventionSource {
    /// A choice offered by the narrator.
    Decision,
    /// A direct act of the supreme being.
    #[default]
    Divine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionChange {
    pub faction: String,
    pub field: FactionField,
    pub delta: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvironmentChange {
    SetWeather(WeatherKind),
    ShiftTemperature(f32),
    ShiftBalance(f32),
    SetVolatility(f32),
}

/// A direct outcome for specific agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentResolution {
    Satisfy { agent: AgentId, need: NeedKind, amount: f32 },
    GoalProgress { agent: AgentId, goal: GoalId, progress: f32 },
    AddGoal { agent: AgentId, kind: GoalKind, description: String, priority: f32, deadline: Option<Turn> },
    AbandonGoal { agent: AgentId, goal: GoalId },
    Interact { a: AgentId, b: AgentId, kind: InteractionKind, intensity: f32 },
    Injure { agent: AgentId, injury: String, severity: f32, healing_rate: f32 },
    Afflict { agent: AgentId, disease: String, severity: f32, progression_rate: f32 },
    Treat { agent: AgentId },
    AdjustWealth { agent: AgentId, amount: f32 },
    Practice { agent: AgentId, skill: String, ticks: f32 },
    Birth { parents: Vec<AgentId>, name: Option<String> },
}

impl AgentResolution {
    /// Agents that must exist and be alive for this resolution to apply.
    fn subjects(&self) -> Vec<AgentId> {
        match self {
            Self::Satisfy { agent, .. }
            | Self::GoalProgress { agent, .. }
            | Self::AddGoal { agent, .. }
            | Self::AbandonGoal { agent, .. }
            | Self::Injure { agent, .. }
            | Self::Afflict { agent, .. }
            | Self::Treat { agent }
            | Self::AdjustWealth { agent, .. }
            | Self::Practice { agent, .. } => vec![*agent],
            Self::Interact { a, b, .. } => vec![*a, *b],
            Self::Birth { parents, .. } => parents.clone(),
        }
    }

    /// Values that must be finite, with their allowed range.
    fn bounded_values(&self) -> Vec<(&'static str, f32, f32, f32)> {
        match self {
            Self::Satisfy { amount, .. } => vec![("amount", *amount, -1.0, 1.0)],
            Self::GoalProgress { progress, .. } => vec![("progress", *progress, 0.0, 1.0)],
            Self::AddGoal { priority, .. } => vec![("priority", *priority, 0.0, 1.0)],
            Self::Interact { intensity, .. } => vec![("intensity", *intensity, 0.0, 1.0)],
            Self::Injure { severity, healing_rate, .. } => {
                vec![("severity", *severity, 0.0, 1.0), ("healing_rate", *healing_rate, 0.0, 1.0)]
            }
            Self::Afflict { severity, progression_rate, .. } => {
                vec![("severity", *severity, 0.0, 1.0), ("progression_rate", *progression_rate, 0.0, 1.0)]
            }
            Self::AdjustWealth { amount, .. } => vec![("amount", *amount, f32::MIN, f32::MAX)],
            Self::Practice { ticks, .. } => vec![("ticks", *ticks, 0.0, f32::MAX)],
            Self::AbandonGoal { .. } | Self::Treat { .. } | Self::Birth { .. } => Vec::new(),
        }
    }
}

/// One applied decision or act. Applied at most once per world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    pub id: String,
    #[serde(default)]
    pub source: InterventionSource,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub faction_changes: Vec<FactionChange>,
    #[serde(default)]
    pub environment_changes: Vec<EnvironmentChange>,
    #[serde(default)]
    pub new_events: Vec<String>,
    #[serde(default)]
    pub resolutions: Vec<AgentResolution>,
}

impl Intervention {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: InterventionSource::Divine,
            description: String::new(),
            faction_changes: Vec::new(),
            environment_changes: Vec::new(),
            new_events: Vec::new(),
            resolutions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_faction_change(mut self, faction: impl Into<String>, field: FactionField, delta: f32) -> Self {
        self.faction_changes.push(FactionChange {
            faction: faction.into(),
            field,
            delta,
        });
        self
    }

    pub fn with_environment_change(mut self, change: EnvironmentChange) -> Self {
        self.environment_changes.push(change);
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.new_events.push(event.into());
        self
    }

    pub fn with_resolution(mut self, resolution: AgentResolution) -> Self {
        self.resolutions.push(resolution);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.faction_changes.is_empty()
            && self.environment_changes.is_empty()
            && self.new_events.is_empty()
            && self.resolutions.is_empty()
    }
}

/// What applying an intervention produced, for the turn delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub births: Vec<AgentId>,
    pub events: Vec<String>,
}

/// Check an intervention against `world` without changing anything.
pub fn check(world: &WorldState, intervention: &Intervention) -> Result<(), SimError> {
    if intervention.id.trim().is_empty() {
        return Err(SimError::Validation("intervention id is blank".into()));
    }
    if world.intervention_applied(&intervention.id) {
        return Err(ConflictKind::AlreadyApplied(intervention.id.clone()).into());
    }
    for change in &intervention.faction_changes {
        if !world.factions.contains_key(&change.faction) {
            return Err(SimError::NotFound(format!("faction {}", change.faction)));
        }
        if !change.delta.is_finite() {
            return Err(SimError::Validation(format!("faction change delta = {}", change.delta)));
        }
    }
    for change in &intervention.environment_changes {
        let value = match change {
            EnvironmentChange::SetWeather(_) => 0.0,
            EnvironmentChange::ShiftTemperature(v) | EnvironmentChange::ShiftBalance(v) => *v,
            EnvironmentChange::SetVolatility(v) => {
                if !in_range(*v, 0.0, 1.0) {
                    return Err(SimError::Validation(format!("volatility = {v}")));
                }
                *v
            }
        };
        if !value.is_finite() {
            return Err(SimError::Validation(format!("environment change = {value}")));
        }
    }
    for resolution in &intervention.resolutions {
        for id in resolution.subjects() {
            let agent = world.require_agent(id)?;
            if !agent.is_alive() {
                return Err(SimError::Validation(format!("agent {id} is deceased")));
            }
        }
        for (field, value, min, max) in resolution.bounded_values() {
            if !in_range(value, min, max) {
                return Err(SimError::Validation(format!("{field} = {value}")));
            }
        }
        if let AgentResolution::Birth { parents, .. } = resolution {
            if parents.len() > 2 {
                return Err(SimError::Validation("a birth has at most two parents".into()));
            }
        }
    }
    check_totals(world, intervention)
}

/// Replay the additive changes on scratch values so that several finite
/// deltas cannot sum past `f32::MAX`.
fn check_totals(world: &WorldState, intervention: &Intervention) -> Result<(), SimError> {
    let mut factions = BTreeMap::new();
    for change in &intervention.faction_changes {
        let faction = match factions.entry(change.faction.as_str()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => match world.factions.get(&change.faction) {
                Some(f) => e.insert(f.clone()),
                None => return Err(SimError::NotFound(format!("faction {}", change.faction))),
            },
        };
        faction.apply_change(change.field, change.delta);
        if faction.value(change.field).is_some_and(|v| !v.is_finite()) {
            return Err(SimError::Validation(format!("faction {} {:?} overflows", change.faction, change.field)));
        }
    }

    let mut temperature = world.environment.weather.temperature;
    for change in &intervention.environment_changes {
        if let EnvironmentChange::ShiftTemperature(delta) = change {
            temperature += delta;
            if !temperature.is_finite() {
                return Err(SimError::Validation("temperature overflows".into()));
            }
        }
    }

    let mut wealth: BTreeMap<AgentId, f32> = BTreeMap::new();
    for resolution in &intervention.resolutions {
        if let AgentResolution::AdjustWealth { agent, amount } = resolution {
            let current = match wealth.get(agent) {
                Some(w) => *w,
                None => world.require_agent(*agent)?.economy.wealth,
            };
            let next = (current + amount).max(0.0);
            if !next.is_finite() {
                return Err(SimError::Validation(format!("agent {agent} wealth overflows")));
            }
            wealth.insert(*agent, next);
        }
    }
    Ok(())
}

/// Check then apply `intervention` to the staged `world` during `turn`.
pub fn apply(
    world: &mut WorldState,
    intervention: &Intervention,
    turn: Turn,
    config: &SimConfig,
    rng: &mut StdRng,
) -> Result<Applied, SimError> {
    check(world, intervention)?;
    let mut applied = Applied::default();

    for change in &intervention.faction_changes {
        if let Some(faction) = world.factions.get_mut(&change.faction) {
            let moved = faction.apply_change(change.field, change.delta);
            log::debug!("faction {} {:?} moved by {moved}", change.faction, change.field);
        }
    }

    for change in &intervention.environment_changes {
        let env = &mut world.environment;
        match change {
            EnvironmentChange::SetWeather(kind) => env.weather.kind = *kind,
            EnvironmentChange::ShiftTemperature(delta) => env.weather.temperature += delta,
            EnvironmentChange::ShiftBalance(delta) => env.ecosystem.shift(*delta),
            EnvironmentChange::SetVolatility(v) => env.volatility = *v,
        }
    }

    for event in &intervention.new_events {
        witness(world, event, turn, config)?;
        applied.events.push(event.clone());
    }

    for resolution in &intervention.resolutions {
        resolve(world, resolution, turn, config, rng, &mut applied)?;
    }

    world.log_intervention(turn, intervention.clone());
    Ok(applied)
}

/// Record a world event and give every living agent a memory of it.
fn witness(world: &mut WorldState, event: &str, turn: Turn, config: &SimConfig) -> Result<(), SimError> {
    world.record_major_event(turn, event);
    for id in world.living_ids() {
        let agent = world.require_agent_mut(id)?;
        let record = Memory::new(MemoryKind::Witnessed, turn, event, WITNESS_IMPORTANCE).with_impact(0.2);
        memory::record(agent, record, &config.memory)?;
    }
    Ok(())
}

fn resolve(
    world: &mut WorldState,
    resolution: &AgentResolution,
    turn: Turn,
    config: &SimConfig,
    rng: &mut StdRng,
    applied: &mut Applied,
) -> Result<(), SimError> {
    match resolution {
        AgentResolution::Satisfy { agent, need, amount } => {
            world.require_agent_mut(*agent)?.satisfy(*need, *amount);
        }
        AgentResolution::GoalProgress { agent, goal, progress } => {
            let agent = world.require_agent_mut(*agent)?;
            goals::resolve_progress(agent, *goal, *progress, turn, &config.memory)?;
        }
        AgentResolution::AddGoal { agent, kind, description, priority, deadline } => {
            let agent = world.require_agent_mut(*agent)?;
            let mut goal = Goal::new(*kind, description.clone(), *priority, turn);
            if let Some(deadline) = deadline {
                goal = goal.with_deadline(*deadline);
            }
            agent.goals.add(goal);
        }
        AgentResolution::AbandonGoal { agent, goal } => {
            let agent = world.require_agent_mut(*agent)?;
            let goal = agent.goals.abandon(*goal)?;
            let record = Memory::new(MemoryKind::Failure, turn, format!("gave up: {}", goal.description), 0.4)
                .with_impact(-0.3);
            memory::record(agent, record, &config.memory)?;
        }
        AgentResolution::Interact { a, b, kind, intensity } => {
            let event = InteractionEvent::new(world.allocate_event_id(), *kind, *intensity);
            let (first, second) = world
                .pair_mut(*a, *b)
                .ok_or_else(|| SimError::Validation(format!("agents {a} and {b} cannot interact")))?;
            interact(first, second, &event, turn, config)?;
        }
        AgentResolution::Injure { agent, injury, severity, healing_rate } => {
            let agent = world.require_agent_mut(*agent)?;
            agent.health.injuries.push(Injury::new(injury.clone(), *severity, *healing_rate));
            let record = Memory::new(MemoryKind::Injury, turn, format!("suffered {injury}"), *severity)
                .with_impact(-*severity);
            memory::record(agent, record, &config.memory)?;
        }
        AgentResolution::Afflict { agent, disease, severity, progression_rate } => {
            let agent = world.require_agent_mut(*agent)?;
            agent.health.diseases.push(Disease::new(disease.clone(), *severity, *progression_rate));
        }
        AgentResolution::Treat { agent } => {
            world.require_agent_mut(*agent)?.health.treat_all();
        }
        AgentResolution::AdjustWealth { agent, amount } => {
            world.require_agent_mut(*agent)?.economy.adjust(*amount);
        }
        AgentResolution::Practice { agent, skill, ticks } => {
            let agent = world.require_agent_mut(*agent)?;
            agent.skills.practice(skill, *ticks, turn, &config.skills);
        }
        AgentResolution::Birth { parents, name } => {
            let id = generation::birth(world, parents, name.clone(), turn, config, rng)?;
            applied.births.push(id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use demiurge_logic::agent::{Agent, DeathCause, Personality};
    use demiurge_logic::faction::{Faction, FactionStats, LegacyStats};
    use rand::SeedableRng;

    use crate::setup::SetupConfig;

    fn world() -> WorldState {
        let mut w = WorldState::new(1, "Test", 3, SetupConfig::default());
        for id in 1..=3 {
            w.insert_agent(Agent::new(id, format!("a{id}"), "human", 0, Personality::default()))
                .unwrap();
        }
        let alpha = Faction::new(
            "Alpha",
            FactionStats::Legacy(LegacyStats {
                wealth: Some(80.0),
                ..LegacyStats::default()
            }),
        );
        w.factions.insert("Alpha".into(), alpha);
        w
    }

    fn run(w: &mut WorldState, iv: &Intervention) -> Result<Applied, SimError> {
        let mut rng = StdRng::seed_from_u64(1);
        apply(w, iv, 1, &SimConfig::default(), &mut rng)
    }

    #[test]
    fn test_faction_change_applies() {
        let mut w = world();
        let iv = Intervention::new("iv-1").with_faction_change("Alpha", FactionField::Wealth, -20.0);
        run(&mut w, &iv).unwrap();
        assert_eq!(w.factions["Alpha"].value(FactionField::Wealth), Some(60.0));
        assert!(w.intervention_applied("iv-1"));
    }

    #[test]
    fn test_unknown_faction_is_not_found() {
        let mut w = world();
        let iv = Intervention::new("iv-1").with_faction_change("Omega", FactionField::Wealth, 5.0);
        assert!(matches!(run(&mut w, &iv), Err(SimError::NotFound(_))));
        assert!(!w.intervention_applied("iv-1"));
    }

    #[test]
    fn test_repeat_is_conflict() {
        let mut w = world();
        let iv = Intervention::new("iv-1").with_event("a comet");
        run(&mut w, &iv).unwrap();
        let err = run(&mut w, &iv).unwrap_err();
        assert!(matches!(err, SimError::Conflict(ConflictKind::AlreadyApplied(_))));
        assert_eq!(w.major_events.len(), 1);
    }

    #[test]
    fn test_event_becomes_witnessed_memory() {
        let mut w = world();
        w.agent_mut(3).unwrap().die(0, DeathCause::Health);
        run(&mut w, &Intervention::new("iv-1").with_event("the river turned red")).unwrap();
        let witnessed = |id| {
            w.agent(id)
                .unwrap()
                .memory
                .iter()
                .filter(|m| m.kind == MemoryKind::Witnessed)
                .count()
        };
        assert_eq!(witnessed(1), 1);
        assert_eq!(witnessed(3), 0);
    }

    #[test]
    fn test_deceased_subject_rejected_before_mutation() {
        let mut w = world();
        w.agent_mut(2).unwrap().die(0, DeathCause::OldAge);
        let iv = Intervention::new("iv-1")
            .with_faction_change("Alpha", FactionField::Wealth, -20.0)
            .with_resolution(AgentResolution::Treat { agent: 2 });
        assert!(matches!(run(&mut w, &iv), Err(SimError::Validation(_))));
        assert_eq!(w.factions["Alpha"].value(FactionField::Wealth), Some(80.0));
    }

    #[test]
    fn test_interaction_resolution() {
        let mut w = world();
        let iv = Intervention::new("iv-1").with_resolution(AgentResolution::Interact {
            a: 1,
            b: 2,
            kind: InteractionKind::Gift,
            intensity: 0.5,
        });
        run(&mut w, &iv).unwrap();
        assert!(w.agent(1).unwrap().relationship(2).is_some());
        assert!(w.agent(2).unwrap().relationship(1).is_some());
    }

    #[test]
    fn test_summed_wealth_overflow_rejected() {
        let mut w = world();
        let before = w.agent(1).unwrap().economy.wealth;
        let iv = Intervention::new("iv-1")
            .with_resolution(AgentResolution::AdjustWealth { agent: 1, amount: f32::MAX })
            .with_resolution(AgentResolution::AdjustWealth { agent: 1, amount: f32::MAX });
        assert!(matches!(run(&mut w, &iv), Err(SimError::Validation(_))));
        assert_eq!(w.agent(1).unwrap().economy.wealth, before);
        assert!(!w.intervention_applied("iv-1"));
    }

    #[test]
    fn test_summed_population_overflow_rejected() {
        let mut w = world();
        let iv = Intervention::new("iv-1")
            .with_faction_change("Alpha", FactionField::Population, f32::MAX)
            .with_faction_change("Alpha", FactionField::Population, f32::MAX);
        assert!(matches!(run(&mut w, &iv), Err(SimError::Validation(_))));
        assert_eq!(w.factions["Alpha"].value(FactionField::Population), Some(1000.0));
    }

    #[test]
    fn test_summed_temperature_overflow_rejected() {
        let mut w = world();
        let iv = Intervention::new("iv-1")
            .with_environment_change(EnvironmentChange::ShiftTemperature(f32::MAX))
            .with_environment_change(EnvironmentChange::ShiftTemperature(f32::MAX));
        assert!(matches!(run(&mut w, &iv), Err(SimError::Validation(_))));
    }

    #[test]
    fn test_negative_progression_rate_rejected() {
        let mut w = world();
        let iv = Intervention::new("iv-1").with_resolution(AgentResolution::Afflict {
            agent: 1,
            disease: "fever".into(),
            severity: 0.3,
            progression_rate: -0.2,
        });
        assert!(matches!(run(&mut w, &iv), Err(SimError::Validation(_))));
        assert!(w.agent(1).unwrap().health.diseases.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "id": "choice-7",
            "source": "decision",
            "factionChanges": [{"faction": "Alpha", "field": "wealth", "delta": -20}],
            "environmentChanges": [{"shiftBalance": -0.1}],
            "resolutions": [{"satisfy": {"agent": 1, "need": "Hunger", "amount": 0.2}}]
        }"#;
        let iv: Intervention = serde_json::from_str(json).unwrap();
        assert_eq!(iv.source, InterventionSource::Decision);
        assert_eq!(iv.environment_changes, vec![EnvironmentChange::ShiftBalance(-0.1)]);
        assert!(iv.new_events.is_empty());
    }
}
