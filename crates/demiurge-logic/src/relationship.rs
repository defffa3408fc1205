//! Relationship graph — one-sided views updated in pairs.
//!
//! Each agent owns its view of every counterpart it knows. [`interact`]
//! writes both views from the same [`InteractionEvent`] inside one call, so a
//! pair is never left half-updated. Deltas are modulated by the owner's
//! personality: agreeable agents gain more trust from positive events,
//! neurotic agents lose more from negative ones.
//!
//! ```
//! use demiurge_logic::agent::{Agent, Personality};
//! use demiurge_logic::config::SimConfig;
//! use demiurge_logic::relationship::{interact, InteractionEvent, InteractionKind};
//!
//! let config = SimConfig::default();
//! let mut a = Agent::new(1, "Ada", "human", 0, Personality::default());
//! let mut b = Agent::new(2, "Bram", "human", 0, Personality::default());
//! interact(&mut a, &mut b, &InteractionEvent::new(7, InteractionKind::Cooperation, 1.0), 3, &config)
//!     .unwrap();
//! assert_eq!(a.relationship(2).unwrap().last_interaction, 3);
//! assert_eq!(b.relationship(1).unwrap().shared_experiences, vec![7]);
//! ```

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, NeedKind, Personality, Turn};
use crate::common::{in_range, signed_unit, unit};
use crate::config::{check, SimConfig};
use crate::error::RuleError;
use crate::memory::{CapacityPolicy, Memory, MemoryKind};

/// Reference to the event that shaped a relationship.
pub type EventRef = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
    Partner,
    /// Assigned at birth or genesis; never reclassified.
    Family,
    Rival,
    Enemy,
}

impl RelationshipKind {
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Friend | Self::CloseFriend | Self::Partner | Self::Family)
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::Rival | Self::Enemy)
    }
}

/// One agent's view of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub strength: f32,
    pub trust: f32,
    pub respect: f32,
    pub attraction: f32,
    /// Most recent events last; bounded by `history_limit`.
    pub shared_experiences: Vec<EventRef>,
    pub last_interaction: Turn,
    /// Recent contact rate in [0, 1]; decays every turn.
    pub frequency: f32,
    pub compatibility: f32,
    /// -1.0 the other dominates, 1.0 the owner dominates.
    pub power_dynamic: f32,
}

impl Relationship {
    pub fn new(kind: RelationshipKind, turn: Turn, compatibility: f32) -> Self {
        Self {
            kind,
            strength: 0.3,
            trust: 0.3,
            respect: 0.3,
            attraction: 0.0,
            shared_experiences: Vec::new(),
            last_interaction: turn,
            frequency: 0.0,
            compatibility: unit(compatibility),
            power_dynamic: 0.0,
        }
    }

    /// Re-derive `kind` from strength, trust and familiarity.
    pub fn reclassify(&mut self) {
        if self.kind == RelationshipKind::Family {
            return;
        }
        let familiar = !self.shared_experiences.is_empty() || self.frequency > 0.0;
        self.kind = if self.trust < 0.15 && self.strength < 0.2 {
            RelationshipKind::Enemy
        } else if familiar && self.trust < 0.3 && self.strength < 0.3 {
            RelationshipKind::Rival
        } else if self.attraction >= 0.6 && self.strength >= 0.6 {
            RelationshipKind::Partner
        } else if self.strength >= 0.75 && self.trust >= 0.6 {
            RelationshipKind::CloseFriend
        } else if self.strength >= 0.5 && self.trust >= 0.4 {
            RelationshipKind::Friend
        } else if familiar {
            RelationshipKind::Acquaintance
        } else {
            RelationshipKind::Stranger
        };
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("strength", self.strength),
            ("trust", self.trust),
            ("respect", self.respect),
            ("attraction", self.attraction),
            ("frequency", self.frequency),
            ("compatibility", self.compatibility),
        ] {
            if !in_range(value, 0.0, 1.0) {
                return Err(format!("{field} = {value} left [0, 1]"));
            }
        }
        if !in_range(self.power_dynamic, -1.0, 1.0) {
            return Err(format!("power_dynamic = {} left [-1, 1]", self.power_dynamic));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    /// Shared experiences kept per view.
    pub history_limit: usize,
    pub frequency_gain: f32,
    /// Frequency lost per tick.
    pub frequency_decay: f32,
    /// Strength a silent relationship drifts toward.
    pub neutral_strength: f32,
    /// Turns without contact before drift starts.
    pub silence_threshold: Turn,
    /// Strength moved toward neutral per tick of silence.
    pub drift_rate: f32,
    /// Companionship restored by a friendly interaction at full intensity.
    pub companionship_gain: f32,
    /// Base importance of the memory each side records.
    pub memory_importance: f32,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            history_limit: 16,
            frequency_gain: 0.1,
            frequency_decay: 0.02,
            neutral_strength: 0.3,
            silence_threshold: 30,
            drift_rate: 0.005,
            companionship_gain: 0.15,
            memory_importance: 0.4,
        }
    }
}

impl RelationshipConfig {
    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        check("relationships.frequency_gain", self.frequency_gain, 0.0, 1.0)?;
        check("relationships.frequency_decay", self.frequency_decay, 0.0, 1.0)?;
        check("relationships.neutral_strength", self.neutral_strength, 0.0, 1.0)?;
        check("relationships.drift_rate", self.drift_rate, 0.0, 1.0)?;
        check("relationships.companionship_gain", self.companionship_gain, 0.0, 1.0)?;
        check("relationships.memory_importance", self.memory_importance, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    Conversation,
    Cooperation,
    Gift,
    Romance,
    SharedHardship,
    Conflict,
    Betrayal,
}

/// Base deltas at full intensity before personality modulation.
struct Deltas {
    strength: f32,
    trust: f32,
    respect: f32,
    attraction: f32,
    /// Shift in dominance toward the bolder side.
    power: f32,
}

impl InteractionKind {
    fn deltas(self) -> Deltas {
        let (strength, trust, respect, attraction, power) = match self {
            Self::Conversation => (0.02, 0.01, 0.01, 0.0, 0.0),
            Self::Cooperation => (0.05, 0.05, 0.04, 0.0, 0.02),
            Self::Gift => (0.04, 0.03, 0.01, 0.01, 0.0),
            Self::Romance => (0.06, 0.03, 0.0, 0.1, 0.0),
            Self::SharedHardship => (0.08, 0.06, 0.03, 0.0, 0.0),
            Self::Conflict => (-0.05, -0.04, -0.01, -0.02, 0.1),
            Self::Betrayal => (-0.2, -0.3, -0.1, -0.05, 0.2),
        };
        Deltas {
            strength,
            trust,
            respect,
            attraction,
            power,
        }
    }

    pub fn is_positive(self) -> bool {
        !matches!(self, Self::Conflict | Self::Betrayal)
    }
}

/// A single event shared by two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: EventRef,
    pub kind: InteractionKind,
    /// 0.0 trivial .. 1.0 defining.
    pub intensity: f32,
}

impl InteractionEvent {
    pub fn new(id: EventRef, kind: InteractionKind, intensity: f32) -> Self {
        Self { id, kind, intensity }
    }
}

/// One minus the Euclidean distance between trait vectors, normalized to [0, 1].
pub fn compatibility(a: &Personality, b: &Personality) -> f32 {
    let sum: f32 = a
        .traits()
        .iter()
        .zip(b.traits().iter())
        .map(|((_, x), (_, y))| (x - y) * (x - y))
        .sum();
    unit(1.0 - sum.sqrt() / (Personality::TRAIT_COUNT as f32).sqrt())
}

/// Update both agents' views of each other from one event.
///
/// Fails before touching either agent when the pair is the same agent,
/// either side is deceased, intensity is out of range, or a hard-capped
/// memory store has no room for the resulting memory.
pub fn interact(
    a: &mut Agent,
    b: &mut Agent,
    event: &InteractionEvent,
    turn: Turn,
    config: &SimConfig,
) -> Result<(), RuleError> {
    if a.id() == b.id() {
        return Err(RuleError::SelfRelationship(a.id()));
    }
    for agent in [&*a, &*b] {
        if !agent.is_alive() {
            return Err(RuleError::Deceased(agent.id()));
        }
    }
    check("interaction.intensity", event.intensity, 0.0, 1.0)?;
    if config.memory.policy == CapacityPolicy::HardCap {
        for agent in [&*a, &*b] {
            if agent.memory.len() >= agent.cognition.memory_capacity {
                return Err(RuleError::CapacityExceeded {
                    capacity: agent.cognition.memory_capacity,
                });
            }
        }
    }

    let compat = compatibility(a.personality(), b.personality());
    let a_view = Counterpart::of(b);
    let b_view = Counterpart::of(a);
    apply(a, &a_view, event, turn, compat, config)?;
    apply(b, &b_view, event, turn, compat, config)?;
    Ok(())
}

/// What one side needs to know about the other while updating its view.
struct Counterpart {
    id: AgentId,
    name: String,
    boldness: f32,
}

impl Counterpart {
    fn of(agent: &Agent) -> Self {
        let p = agent.personality();
        Self {
            id: agent.id(),
            name: agent.name().to_string(),
            boldness: (p.courage + p.ambition) / 2.0,
        }
    }
}

fn apply(
    owner: &mut Agent,
    other: &Counterpart,
    event: &InteractionEvent,
    turn: Turn,
    compat: f32,
    config: &SimConfig,
) -> Result<(), RuleError> {
    let rel_config = &config.relationships;
    let p = *owner.personality();
    let base = event.kind.deltas();
    let intensity = event.intensity;
    let boldness = (p.courage + p.ambition) / 2.0;

    // Positive trust scales with agreeableness, every loss with neuroticism.
    let scale = |delta: f32, positive_gain: f32| {
        if delta >= 0.0 {
            delta * positive_gain * intensity
        } else {
            delta * (0.5 + p.neuroticism) * intensity
        }
    };

    let rel = owner
        .relationships
        .entry(other.id)
        .or_insert_with(|| Relationship::new(RelationshipKind::Stranger, turn, compat));
    rel.strength = unit(rel.strength + scale(base.strength, 0.5 + p.empathy));
    rel.trust = unit(rel.trust + scale(base.trust, 0.5 + p.agreeableness));
    rel.respect = unit(rel.respect + scale(base.respect, 1.0));
    rel.attraction = unit(rel.attraction + scale(base.attraction, 0.5 + p.openness));
    rel.power_dynamic =
        signed_unit(rel.power_dynamic + base.power * intensity * (boldness - other.boldness));
    rel.last_interaction = rel.last_interaction.max(turn);
    rel.shared_experiences.push(event.id);
    if rel.shared_experiences.len() > rel_config.history_limit {
        let excess = rel.shared_experiences.len() - rel_config.history_limit;
        rel.shared_experiences.drain(..excess);
    }
    rel.frequency = unit(rel.frequency + rel_config.frequency_gain * intensity.max(0.1));
    rel.compatibility = compat;
    rel.reclassify();

    let valence = if event.kind.is_positive() { 1.0 } else { -1.0 };
    if event.kind.is_positive() {
        owner.satisfy(NeedKind::Companionship, rel_config.companionship_gain * intensity);
        owner.emotions.happiness = unit(owner.emotions.happiness + 0.05 * intensity);
        owner.emotions.loneliness = unit(owner.emotions.loneliness - 0.1 * intensity);
    } else {
        owner.emotions.anger = unit(owner.emotions.anger + 0.1 * intensity * (0.5 + p.neuroticism));
        owner.emotions.trust = unit(owner.emotions.trust - 0.05 * intensity);
    }

    let memory = Memory::new(
        MemoryKind::Interaction,
        turn,
        format!("{:?} with {}", event.kind, other.name),
        rel_config.memory_importance * (0.5 + intensity),
    )
    .with_participants(vec![other.id])
    .with_impact(valence * intensity);
    crate::memory::record(owner, memory, &config.memory)?;
    Ok(())
}

/// Create matching views of a fixed kind on both sides, e.g. kinship at birth.
pub fn establish(
    a: &mut Agent,
    b: &mut Agent,
    kind: RelationshipKind,
    turn: Turn,
) -> Result<(), RuleError> {
    if a.id() == b.id() {
        return Err(RuleError::SelfRelationship(a.id()));
    }
    let compat = compatibility(a.personality(), b.personality());
    let mut view = Relationship::new(kind, turn, compat);
    if kind == RelationshipKind::Family {
        view.strength = 0.7;
        view.trust = 0.6;
    }
    a.relationships.insert(b.id(), view.clone());
    b.relationships.insert(a.id(), view);
    Ok(())
}

/// Per-turn upkeep of one agent's views.
///
/// Frequency decays; relationships silent past the threshold drift toward
/// neutral strength without touching `last_interaction`. Views of agents for
/// which `is_alive` returns false are left frozen.
pub fn maintain(
    agent: &mut Agent,
    now: Turn,
    ticks: f32,
    is_alive: impl Fn(AgentId) -> bool,
    config: &RelationshipConfig,
) {
    for (other, rel) in agent.relationships.iter_mut() {
        if !is_alive(*other) {
            continue;
        }
        rel.frequency = unit(rel.frequency - config.frequency_decay * ticks);
        if now.saturating_sub(rel.last_interaction) > config.silence_threshold {
            let gap = config.neutral_strength - rel.strength;
            let step = (config.drift_rate * ticks).min(gap.abs());
            rel.strength = unit(rel.strength + step.copysign(gap));
        }
        rel.reclassify();
    }
}
