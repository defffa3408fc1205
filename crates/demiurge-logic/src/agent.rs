//! Agent state — the data record for one simulated inhabitant.
//!
//! An [`Agent`] carries no behavior of its own beyond accessors and
//! invariant checks. The decay engine, memory subsystem, relationship graph
//! and goal engine operate on it from their own modules.
//!
//! Personality is fixed at creation and only exposed by shared reference.
//! Relationships are only written through [`crate::relationship`], which
//! keeps the "never related to self" invariant by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{in_range, unit, Vec3};
use crate::economy::Economy;
use crate::error::InvariantBreach;
use crate::goals::GoalSet;
use crate::health::HealthRecord;
use crate::memory::MemoryStore;
use crate::relationship::Relationship;
use crate::skills::SkillSet;

/// Stable agent identifier, unique within a world.
pub type AgentId = u32;

/// Simulation turn number.
pub type Turn = u64;

/// Who the agent is and where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: AgentId,
    pub name: String,
    pub species: String,
    pub birth_turn: Turn,
    pub birth_location: String,
}

/// Body and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physical {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Meters.
    pub height: f32,
    /// Kilograms.
    pub weight: f32,
    pub appearance: String,
}

impl Default for Physical {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            height: 1.7,
            weight: 70.0,
            appearance: String::new(),
        }
    }
}

/// Ten independent traits, each in [0, 1]. Immutable once the agent exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
    pub curiosity: f32,
    pub courage: f32,
    pub empathy: f32,
    pub ambition: f32,
    pub spirituality: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

impl Personality {
    pub const TRAIT_COUNT: usize = 10;

    /// Every trait set to the same value.
    pub fn uniform(value: f32) -> Self {
        let v = unit(value);
        Self {
            openness: v,
            conscientiousness: v,
            extraversion: v,
            agreeableness: v,
            neuroticism: v,
            curiosity: v,
            courage: v,
            empathy: v,
            ambition: v,
            spirituality: v,
        }
    }

    pub fn traits(&self) -> [(&'static str, f32); Self::TRAIT_COUNT] {
        [
            ("openness", self.openness),
            ("conscientiousness", self.conscientiousness),
            ("extraversion", self.extraversion),
            ("agreeableness", self.agreeableness),
            ("neuroticism", self.neuroticism),
            ("curiosity", self.curiosity),
            ("courage", self.courage),
            ("empathy", self.empathy),
            ("ambition", self.ambition),
            ("spirituality", self.spirituality),
        ]
    }

    /// Resting emotional state this personality drifts back toward.
    pub fn baseline(&self) -> Emotions {
        Emotions {
            happiness: unit(0.5 + 0.25 * (self.extraversion - self.neuroticism)),
            sadness: unit(0.1 + 0.2 * self.neuroticism),
            anger: unit(0.05 + 0.15 * (1.0 - self.agreeableness)),
            fear: unit(0.05 + 0.2 * self.neuroticism * (1.0 - self.courage)),
            surprise: 0.1,
            disgust: 0.05,
            trust: unit(0.3 + 0.4 * self.agreeableness),
            anticipation: unit(0.2 + 0.3 * self.curiosity),
            loneliness: unit(0.1 + 0.1 * (1.0 - self.extraversion)),
            contentment: unit(0.4 + 0.2 * (self.conscientiousness - self.neuroticism)),
        }
    }
}

/// Ten affect channels, each in [0, 1], updated every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emotions {
    pub happiness: f32,
    pub sadness: f32,
    pub anger: f32,
    pub fear: f32,
    pub surprise: f32,
    pub disgust: f32,
    pub trust: f32,
    pub anticipation: f32,
    pub loneliness: f32,
    pub contentment: f32,
}

impl Emotions {
    pub fn channels(&self) -> [(&'static str, f32); 10] {
        [
            ("happiness", self.happiness),
            ("sadness", self.sadness),
            ("anger", self.anger),
            ("fear", self.fear),
            ("surprise", self.surprise),
            ("disgust", self.disgust),
            ("trust", self.trust),
            ("anticipation", self.anticipation),
            ("loneliness", self.loneliness),
            ("contentment", self.contentment),
        ]
    }

    fn channels_mut(&mut self) -> [&mut f32; 10] {
        [
            &mut self.happiness,
            &mut self.sadness,
            &mut self.anger,
            &mut self.fear,
            &mut self.surprise,
            &mut self.disgust,
            &mut self.trust,
            &mut self.anticipation,
            &mut self.loneliness,
            &mut self.contentment,
        ]
    }

    /// Move every channel `fraction` of the way toward `baseline`.
    pub fn relax_toward(&mut self, baseline: &Emotions, fraction: f32) {
        let targets = baseline.channels();
        for (value, (_, target)) in self.channels_mut().into_iter().zip(targets) {
            *value = unit(*value + (target - *value) * fraction);
        }
    }
}

/// Physical needs. Every field except `pain` reads 1.0 when fully satisfied;
/// `pain` reads 0.0 when the agent feels none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalNeeds {
    pub hunger: f32,
    pub thirst: f32,
    pub fatigue: f32,
    pub health: f32,
    pub comfort: f32,
    pub temperature: f32,
    pub hygiene: f32,
    pub pain: f32,
}

impl Default for PhysicalNeeds {
    fn default() -> Self {
        Self {
            hunger: 1.0,
            thirst: 1.0,
            fatigue: 1.0,
            health: 1.0,
            comfort: 1.0,
            temperature: 1.0,
            hygiene: 1.0,
            pain: 0.0,
        }
    }
}

impl PhysicalNeeds {
    pub fn fields(&self) -> [(&'static str, f32); 8] {
        [
            ("hunger", self.hunger),
            ("thirst", self.thirst),
            ("fatigue", self.fatigue),
            ("health", self.health),
            ("comfort", self.comfort),
            ("temperature", self.temperature),
            ("hygiene", self.hygiene),
            ("pain", self.pain),
        ]
    }

    /// Largest deficit among hunger, thirst and fatigue.
    pub fn worst_survival_deficit(&self) -> f32 {
        (1.0 - self.hunger)
            .max(1.0 - self.thirst)
            .max(1.0 - self.fatigue)
    }

    /// Whether hunger, thirst and fatigue all exceed `threshold`.
    pub fn survival_above(&self, threshold: f32) -> bool {
        self.hunger > threshold && self.thirst > threshold && self.fatigue > threshold
    }
}

/// Social needs, each in [0, 1] with 1.0 fully satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialNeeds {
    pub companionship: f32,
    pub respect: f32,
    pub love: f32,
    pub belonging: f32,
    pub achievement: f32,
    pub autonomy: f32,
    pub purpose: f32,
    pub security: f32,
}

impl Default for SocialNeeds {
    fn default() -> Self {
        Self {
            companionship: 0.8,
            respect: 0.7,
            love: 0.7,
            belonging: 0.7,
            achievement: 0.6,
            autonomy: 0.7,
            purpose: 0.7,
            security: 0.8,
        }
    }
}

impl SocialNeeds {
    pub fn fields(&self) -> [(&'static str, f32); 8] {
        [
            ("companionship", self.companionship),
            ("respect", self.respect),
            ("love", self.love),
            ("belonging", self.belonging),
            ("achievement", self.achievement),
            ("autonomy", self.autonomy),
            ("purpose", self.purpose),
            ("security", self.security),
        ]
    }
}

/// A need that resolution calls can satisfy directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedKind {
    Hunger,
    Thirst,
    Fatigue,
    Comfort,
    Temperature,
    Hygiene,
    Companionship,
    Respect,
    Love,
    Belonging,
    Achievement,
    Autonomy,
    Purpose,
    Security,
}

/// Static or slow-changing mental capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cognition {
    pub intelligence: f32,
    pub wisdom: f32,
    /// Maximum memories retained.
    pub memory_capacity: usize,
    /// Size of the working-memory set.
    pub attention_span: usize,
    pub processing_speed: f32,
}

impl Default for Cognition {
    fn default() -> Self {
        Self {
            intelligence: 0.5,
            wisdom: 0.5,
            memory_capacity: 64,
            attention_span: 7,
            processing_speed: 0.5,
        }
    }
}

/// What the agent is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Working,
    Resting,
    Socializing,
    Worshipping,
    Traveling,
    Recovering,
    Mourning,
}

/// Current activity plus the derived drive levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub activity: Activity,
    pub activity_started: Turn,
    pub activity_location: String,
    pub stress: f32,
    pub energy: f32,
    pub motivation: f32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            activity: Activity::Idle,
            activity_started: 0,
            activity_location: String::new(),
            stress: 0.1,
            energy: 1.0,
            motivation: 0.6,
        }
    }
}

impl Behavior {
    /// Switch activity, restarting the activity clock only on a real change.
    pub fn begin(&mut self, activity: Activity, turn: Turn, location: impl Into<String>) {
        if self.activity != activity {
            self.activity = activity;
            self.activity_started = turn;
        }
        self.activity_location = location.into();
    }
}

/// Cultural identity and weighted beliefs/values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Culture {
    pub culture_id: String,
    pub languages: Vec<String>,
    pub beliefs: BTreeMap<String, f32>,
    pub values: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Health reached zero.
    Health,
    /// Lived past life expectancy.
    OldAge,
}

/// Whether the agent still takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vitality {
    Alive,
    Deceased { turn: Turn, cause: DeathCause },
}

/// One simulated inhabitant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub identity: Identity,
    pub physical: Physical,
    personality: Personality,
    pub emotions: Emotions,
    pub needs: PhysicalNeeds,
    pub social: SocialNeeds,
    pub cognition: Cognition,
    pub skills: SkillSet,
    pub goals: GoalSet,
    pub(crate) relationships: BTreeMap<AgentId, Relationship>,
    pub economy: Economy,
    pub culture: Culture,
    pub health: HealthRecord,
    pub behavior: Behavior,
    pub memory: MemoryStore,
    pub faction: Option<String>,
    pub vitality: Vitality,
    /// Turns lived before old age ends the agent.
    pub life_expectancy: Turn,
}

impl Agent {
    /// Create an agent with default needs, an empty memory and no goals.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        species: impl Into<String>,
        birth_turn: Turn,
        personality: Personality,
    ) -> Self {
        let personality = Personality {
            openness: unit(personality.openness),
            conscientiousness: unit(personality.conscientiousness),
            extraversion: unit(personality.extraversion),
            agreeableness: unit(personality.agreeableness),
            neuroticism: unit(personality.neuroticism),
            curiosity: unit(personality.curiosity),
            courage: unit(personality.courage),
            empathy: unit(personality.empathy),
            ambition: unit(personality.ambition),
            spirituality: unit(personality.spirituality),
        };
        Self {
            identity: Identity {
                id,
                name: name.into(),
                species: species.into(),
                birth_turn,
                birth_location: String::new(),
            },
            physical: Physical::default(),
            emotions: personality.baseline(),
            personality,
            needs: PhysicalNeeds::default(),
            social: SocialNeeds::default(),
            cognition: Cognition::default(),
            skills: SkillSet::default(),
            goals: GoalSet::default(),
            relationships: BTreeMap::new(),
            economy: Economy::default(),
            culture: Culture::default(),
            health: HealthRecord::default(),
            behavior: Behavior::default(),
            memory: MemoryStore::default(),
            faction: None,
            vitality: Vitality::Alive,
            life_expectancy: 4_000,
        }
    }

    pub fn with_birth_location(mut self, location: impl Into<String>) -> Self {
        self.identity.birth_location = location.into();
        self
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    pub fn with_cognition(mut self, cognition: Cognition) -> Self {
        self.cognition = cognition;
        self
    }

    pub fn with_life_expectancy(mut self, turns: Turn) -> Self {
        self.life_expectancy = turns;
        self
    }

    pub fn id(&self) -> AgentId {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.vitality, Vitality::Alive)
    }

    pub fn age(&self, now: Turn) -> Turn {
        now.saturating_sub(self.identity.birth_turn)
    }

    /// This agent's view of `other`, if it has one.
    pub fn relationship(&self, other: AgentId) -> Option<&Relationship> {
        self.relationships.get(&other)
    }

    pub fn relationships(&self) -> &BTreeMap<AgentId, Relationship> {
        &self.relationships
    }

    /// Drop this agent's view of `other`. The counterpart's view is untouched.
    pub fn forget_relationship(&mut self, other: AgentId) -> Option<Relationship> {
        self.relationships.remove(&other)
    }

    /// Raise a need's satisfaction by `amount`, clamped to [0, 1].
    pub fn satisfy(&mut self, need: NeedKind, amount: f32) {
        let value = match need {
            NeedKind::Hunger => &mut self.needs.hunger,
            NeedKind::Thirst => &mut self.needs.thirst,
            NeedKind::Fatigue => &mut self.needs.fatigue,
            NeedKind::Comfort => &mut self.needs.comfort,
            NeedKind::Temperature => &mut self.needs.temperature,
            NeedKind::Hygiene => &mut self.needs.hygiene,
            NeedKind::Companionship => &mut self.social.companionship,
            NeedKind::Respect => &mut self.social.respect,
            NeedKind::Love => &mut self.social.love,
            NeedKind::Belonging => &mut self.social.belonging,
            NeedKind::Achievement => &mut self.social.achievement,
            NeedKind::Autonomy => &mut self.social.autonomy,
            NeedKind::Purpose => &mut self.social.purpose,
            NeedKind::Security => &mut self.social.security,
        };
        *value = unit(*value + amount);
    }

    /// Mark the agent deceased. Has no effect on an agent already dead.
    pub fn die(&mut self, turn: Turn, cause: DeathCause) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.vitality = Vitality::Deceased { turn, cause };
        self.behavior.activity = Activity::Idle;
        self.physical.velocity = Vec3::ZERO;
        true
    }

    /// Check every bounded field and structural invariant.
    pub fn validate(&self) -> Result<(), InvariantBreach> {
        let id = self.id();
        let traits = self.personality.traits();
        let channels = self.emotions.channels();
        let needs = self.needs.fields();
        let social = self.social.fields();
        let unit_groups: [&[(&'static str, f32)]; 4] = [&traits, &channels, &needs, &social];
        for group in unit_groups {
            for &(field, value) in group {
                if !in_range(value, 0.0, 1.0) {
                    return Err(InvariantBreach::new(id, format!("{field} = {value} left [0, 1]")));
                }
            }
        }
        for (field, value) in [
            ("stress", self.behavior.stress),
            ("energy", self.behavior.energy),
            ("motivation", self.behavior.motivation),
        ] {
            if !in_range(value, 0.0, 1.0) {
                return Err(InvariantBreach::new(id, format!("{field} = {value} left [0, 1]")));
            }
        }
        if !self.physical.position.is_finite() || !self.physical.velocity.is_finite() {
            return Err(InvariantBreach::new(id, "non-finite position or velocity"));
        }
        if self.relationships.contains_key(&id) {
            return Err(InvariantBreach::new(id, "relationship with self"));
        }
        for (other, rel) in &self.relationships {
            rel.validate()
                .map_err(|detail| InvariantBreach::new(id, format!("relationship {other}: {detail}")))?;
        }
        self.memory
            .validate(self.cognition.memory_capacity)
            .map_err(|detail| InvariantBreach::new(id, detail))?;
        self.goals
            .validate()
            .map_err(|detail| InvariantBreach::new(id, detail))?;
        self.skills
            .validate()
            .map_err(|detail| InvariantBreach::new(id, detail))?;
        self.health
            .validate()
            .map_err(|detail| InvariantBreach::new(id, detail))?;
        if !self.economy.wealth.is_finite() || self.economy.wealth < 0.0 {
            return Err(InvariantBreach::new(id, format!("wealth = {}", self.economy.wealth)));
        }
        Ok(())
    }

    /// Cheap precondition used by the decay engine in debug builds.
    pub(crate) fn bounds_hold(&self) -> bool {
        self.emotions.channels().iter().all(|(_, v)| in_range(*v, 0.0, 1.0))
            && self.needs.fields().iter().all(|(_, v)| in_range(*v, 0.0, 1.0))
            && self.social.fields().iter().all(|(_, v)| in_range(*v, 0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_is_valid() {
        let agent = Agent::new(1, "Ilsa", "human", 0, Personality::default());
        assert!(agent.validate().is_ok());
        assert!(agent.is_alive());
        assert_eq!(agent.name(), "Ilsa");
    }

    #[test]
    fn test_personality_clamped_on_creation() {
        let mut traits = Personality::default();
        traits.courage = 1.7;
        traits.neuroticism = -0.3;
        let agent = Agent::new(1, "Ilsa", "human", 0, traits);
        assert_eq!(agent.personality().courage, 1.0);
        assert_eq!(agent.personality().neuroticism, 0.0);
    }

    #[test]
    fn test_satisfy_clamps() {
        let mut agent = Agent::new(1, "Ilsa", "human", 0, Personality::default());
        agent.needs.hunger = 0.9;
        agent.satisfy(NeedKind::Hunger, 0.5);
        assert_eq!(agent.needs.hunger, 1.0);
        agent.satisfy(NeedKind::Security, -5.0);
        assert_eq!(agent.social.security, 0.0);
    }

    #[test]
    fn test_validate_catches_out_of_range() {
        let mut agent = Agent::new(3, "Ilsa", "human", 0, Personality::default());
        agent.emotions.fear = 1.2;
        let breach = agent.validate().unwrap_err();
        assert_eq!(breach.agent, 3);
        assert!(breach.detail.contains("fear"));
    }

    #[test]
    fn test_die_only_once() {
        let mut agent = Agent::new(1, "Ilsa", "human", 0, Personality::default());
        assert!(agent.die(5, DeathCause::OldAge));
        assert!(!agent.die(6, DeathCause::Health));
        assert_eq!(
            agent.vitality,
            Vitality::Deceased {
                turn: 5,
                cause: DeathCause::OldAge
            }
        );
    }

    #[test]
    fn test_baseline_follows_personality() {
        let mut cheerful = Personality::default();
        cheerful.extraversion = 1.0;
        cheerful.neuroticism = 0.0;
        let mut gloomy = Personality::default();
        gloomy.extraversion = 0.0;
        gloomy.neuroticism = 1.0;
        assert!(cheerful.baseline().happiness > gloomy.baseline().happiness);
    }
}
