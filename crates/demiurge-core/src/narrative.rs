//! Narrative collaborator seam.
//!
//! After a turn commits, the engine hands the narrator a read-only
//! [`Projection`] of the committed world and gets back a narrative, a set of
//! choices, and the `worldStateChanges` that become the next turn's
//! intervention. The narrator may answer in plain text or in the structured
//! shape; both are accepted.

use demiurge_logic::agent::Turn;
use demiurge_logic::faction::{summarize, FactionStatus, FactionSummary};
use serde::{Deserialize, Serialize};

use crate::delta::WorldDelta;
use crate::error::NarrativeError;
use crate::intervention::{AgentResolution, EnvironmentChange, FactionChange, Intervention, InterventionSource};
use crate::world::WorldState;

/// How many recent major events a projection carries by default.
pub const DEFAULT_RECENT_EVENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub world_name: String,
    pub world_type: String,
    pub creator: String,
    pub turn: Turn,
    pub year: u32,
    pub season: String,
    pub population: usize,
    pub living: usize,
}

/// Everything the narrator may see. Built from a committed world only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub overview: Overview,
    pub factions: Vec<FactionSummary>,
    pub environment: String,
    pub recent_events: Vec<String>,
    pub delta: WorldDelta,
}

impl Projection {
    pub fn build(world: &WorldState, delta: &WorldDelta, recent: usize) -> Self {
        let calendar = &world.environment.calendar;
        let start = world.major_events.len().saturating_sub(recent);
        Self {
            overview: Overview {
                world_name: world.name.clone(),
                world_type: world.setup.world_type.clone(),
                creator: world.setup.supreme_being.identity.clone(),
                turn: world.turn,
                year: calendar.year,
                season: format!("{:?}", calendar.season()),
                population: world.population(),
                living: world.living_population(),
            },
            factions: world
                .factions
                .values()
                .map(|f| summarize(f, |id| world.agent(id)))
                .collect(),
            environment: world.environment.summary(),
            recent_events: world.major_events[start..]
                .iter()
                .map(|e| format!("Turn {}: {}", e.turn, e.description))
                .collect(),
            delta: delta.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredNarrative {
    pub title: String,
    pub opening: String,
    pub situation: String,
    pub stakes: String,
    #[serde(default)]
    pub perspective: String,
}

/// Narrative text in either accepted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Narrative {
    Text(String),
    Structured(StructuredNarrative),
}

impl Narrative {
    /// Flatten to plain text for display or legacy storage.
    pub fn text(&self) -> String {
        match self {
            Narrative::Text(text) => text.clone(),
            Narrative::Structured(s) => {
                let mut parts = vec![s.title.as_str(), s.opening.as_str(), s.situation.as_str(), s.stakes.as_str()];
                if !s.perspective.is_empty() {
                    parts.push(s.perspective.as_str());
                }
                parts.retain(|p| !p.is_empty());
                parts.join("\n\n")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Consequences the narrator proposes for the next turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStateChanges {
    #[serde(default)]
    pub faction_changes: Vec<FactionChange>,
    #[serde(default)]
    pub environment_changes: Vec<EnvironmentChange>,
    #[serde(default)]
    pub new_events: Vec<String>,
    #[serde(default)]
    pub resolutions: Vec<AgentResolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeResponse {
    pub narrative: Narrative,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub world_state_changes: WorldStateChanges,
}

impl NarrativeResponse {
    pub fn from_json(json: &str) -> Result<Self, NarrativeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The intervention that follows when the player picks `choice_id`
    /// after turn `turn`. Unknown choices yield `None`.
    pub fn intervention_for(&self, turn: Turn, choice_id: &str) -> Option<Intervention> {
        let choice = self.choices.iter().find(|c| c.id == choice_id)?;
        let changes = self.world_state_changes.clone();
        Some(Intervention {
            id: format!("turn-{turn}-{}", choice.id),
            source: InterventionSource::Decision,
            description: choice.text.clone(),
            faction_changes: changes.faction_changes,
            environment_changes: changes.environment_changes,
            new_events: changes.new_events,
            resolutions: changes.resolutions,
        })
    }
}

/// The narrative-generation service.
pub trait NarrativeService: Send + Sync {
    fn narrate(&self, projection: &Projection) -> Result<NarrativeResponse, NarrativeError>;
}

/// A local narrator that describes the projection without any external
/// service. Offers no choices and proposes no changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chronicler;

impl NarrativeService for Chronicler {
    fn narrate(&self, projection: &Projection) -> Result<NarrativeResponse, NarrativeError> {
        let o = &projection.overview;
        let d = &projection.delta;
        let strongest = projection
            .factions
            .iter()
            .max_by(|a, b| a.power.total_cmp(&b.power))
            .map(|f| format!("{} holds the most sway ({:?}).", f.name, f.status))
            .unwrap_or_default();
        let failing = projection
            .factions
            .iter()
            .filter(|f| f.status == FactionStatus::Collapsing)
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        let stakes = if failing.is_empty() {
            strongest
        } else {
            format!("{strongest} {} teeters on collapse.", failing.join(" and "))
        };
        let mut situation = format!(
            "{} of {} souls live. {} born, {} died.",
            o.living,
            o.population,
            d.births.len(),
            d.deaths.len()
        );
        if d.is_quiet() {
            situation.push_str(" The season turns quietly.");
        }
        Ok(NarrativeResponse {
            narrative: Narrative::Structured(StructuredNarrative {
                title: format!("{}, turn {}", o.world_name, o.turn),
                opening: format!("Year {}, {}. {}", o.year, o.season, projection.environment),
                situation,
                stakes,
                perspective: o.creator.clone(),
            }),
            choices: Vec::new(),
            world_state_changes: WorldStateChanges::default(),
        })
    }
}
