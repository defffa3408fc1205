//! World state — the container every turn reads and replaces.
//!
//! Agents live in an ordered map keyed by id, so iteration is always in
//! ascending id order and counterparts are resolved through the world by id
//! rather than by reference. Factions are keyed by name.

use std::collections::BTreeMap;

use demiurge_logic::agent::{Agent, AgentId, Turn};
use demiurge_logic::common::Vec3;
use demiurge_logic::environment::Environment;
use demiurge_logic::error::InvariantBreach;
use demiurge_logic::faction::Faction;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::intervention::Intervention;
use crate::setup::{SetupConfig, WorldRules};

pub type WorldId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub climate: String,
    pub center: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefSystem {
    pub name: String,
    pub deity: String,
    pub tenets: Vec<String>,
    pub adherents: Vec<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MajorEvent {
    pub turn: Turn,
    pub description: String,
}

/// Snapshot summary persisted alongside the world record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub turn: Turn,
    pub year: u32,
    pub season: String,
    pub weather: String,
    pub balance: f32,
    pub major_events: Vec<String>,
}

/// How many recent major events the current-state summary carries.
const RECENT_EVENTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub id: WorldId,
    pub name: String,
    pub seed: u64,
    /// Completed turns; only ever increases.
    pub turn: Turn,
    pub setup: SetupConfig,
    pub rules: WorldRules,
    agents: BTreeMap<AgentId, Agent>,
    pub factions: BTreeMap<String, Faction>,
    pub environment: Environment,
    pub regions: Vec<Region>,
    pub belief_systems: Vec<BeliefSystem>,
    pub major_events: Vec<MajorEvent>,
    intervention_log: BTreeMap<Turn, Vec<Intervention>>,
    /// Births owed to the cycle of death, delivered next turn.
    pub pending_births: u32,
    next_agent_id: AgentId,
    next_event_id: u64,
    pub setup_complete: bool,
}

impl WorldState {
    pub fn new(id: WorldId, name: impl Into<String>, seed: u64, setup: SetupConfig) -> Self {
        let rules = setup.rules();
        let mut environment = Environment::default();
        environment.volatility = rules.volatility;
        environment.calendar.days_per_turn = rules.days_per_turn;
        Self {
            id,
            name: name.into(),
            seed,
            turn: 0,
            setup,
            rules,
            agents: BTreeMap::new(),
            factions: BTreeMap::new(),
            environment,
            regions: Vec::new(),
            belief_systems: Vec::new(),
            major_events: Vec::new(),
            intervention_log: BTreeMap::new(),
            pending_births: 0,
            next_agent_id: 1,
            next_event_id: 1,
            setup_complete: false,
        }
    }

    // ── Agents ─────────────────────────────────────────────────────────

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Agents in ascending id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn living_ids(&self) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| a.id())
            .collect()
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn living_population(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }

    /// Look up an agent or fail with `NotFound`.
    pub fn require_agent(&self, id: AgentId) -> Result<&Agent, SimError> {
        self.agent(id)
            .ok_or_else(|| SimError::NotFound(format!("agent {id}")))
    }

    pub fn require_agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, SimError> {
        self.agents
            .get_mut(&id)
            .ok_or_else(|| SimError::NotFound(format!("agent {id}")))
    }

    /// Reserve the next agent id.
    pub fn allocate_agent_id(&mut self) -> AgentId {
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        id
    }

    /// Add an agent. Ids must be unique; the id counter skips past it.
    pub fn insert_agent(&mut self, agent: Agent) -> Result<AgentId, SimError> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            return Err(SimError::Validation(format!("agent {id} already exists")));
        }
        self.next_agent_id = self.next_agent_id.max(id + 1);
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Two distinct agents borrowed mutably at once.
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> Option<(&mut Agent, &mut Agent)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (id, agent) in self.agents.iter_mut() {
            if *id == a {
                first = Some(agent);
            } else if *id == b {
                second = Some(agent);
            }
        }
        first.zip(second)
    }

    // ── Events and interventions ───────────────────────────────────────

    pub fn allocate_event_id(&mut self) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    pub fn record_major_event(&mut self, turn: Turn, description: impl Into<String>) {
        self.major_events.push(MajorEvent {
            turn,
            description: description.into(),
        });
    }

    pub fn intervention_applied(&self, id: &str) -> bool {
        self.intervention_log
            .values()
            .flatten()
            .any(|iv| iv.id == id)
    }

    pub fn log_intervention(&mut self, turn: Turn, intervention: Intervention) {
        self.intervention_log.entry(turn).or_default().push(intervention);
    }

    pub fn interventions_at(&self, turn: Turn) -> &[Intervention] {
        self.intervention_log.get(&turn).map_or(&[], |v| v.as_slice())
    }

    // ── Summaries and invariants ───────────────────────────────────────

    pub fn current_state(&self) -> CurrentState {
        let calendar = &self.environment.calendar;
        let start = self.major_events.len().saturating_sub(RECENT_EVENTS);
        CurrentState {
            turn: self.turn,
            year: calendar.year,
            season: format!("{:?}", calendar.season()),
            weather: self.environment.weather.describe(),
            balance: self.environment.ecosystem.balance,
            major_events: self.major_events[start..]
                .iter()
                .map(|e| e.description.clone())
                .collect(),
        }
    }

    /// Check every agent plus the structural invariants of the container.
    pub fn validate(&self) -> Result<(), InvariantBreach> {
        for (id, agent) in &self.agents {
            if *id != agent.id() {
                return Err(InvariantBreach::new(*id, format!("stored under id {id} but reports {}", agent.id())));
            }
            agent.validate()?;
        }
        for faction in self.factions.values() {
            faction.validate()?;
            for member in &faction.members {
                if !self.agents.contains_key(member) {
                    return Err(InvariantBreach::new(
                        *member,
                        format!("listed in faction {} but does not exist", faction.name),
                    ));
                }
            }
        }
        Ok(())
    }
}
