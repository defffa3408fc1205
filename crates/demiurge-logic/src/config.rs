//! Simulation tuning — decay rates, cross-influence coefficients, and
//! per-subsystem parameters.
//!
//! Every numeric policy the engine applies lives here so a world can be
//! re-tuned without touching the update code. [`SimConfig::default`] is the
//! shipped balance; [`SimConfig::validate`] rejects values that would let a
//! bounded field escape its range.

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::goals::GoalConfig;
use crate::memory::MemoryConfig;
use crate::relationship::RelationshipConfig;
use crate::skills::SkillProgressionConfig;

/// Signed per-tick rates for physical needs. Negative values drain
/// satisfaction, positive values restore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalRates {
    pub hunger: f32,
    pub thirst: f32,
    pub fatigue: f32,
    pub comfort: f32,
    pub hygiene: f32,
    /// Fraction of the gap toward the ambient thermal target closed per tick.
    pub temperature_drift: f32,
    /// Pain relief per tick when no injury keeps it up.
    pub pain_relief: f32,
}

impl Default for PhysicalRates {
    fn default() -> Self {
        Self {
            hunger: -0.04,
            thirst: -0.06,
            fatigue: -0.03,
            comfort: -0.02,
            hygiene: -0.025,
            temperature_drift: 0.25,
            pain_relief: 0.05,
        }
    }
}

/// Signed per-tick rates for social needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialRates {
    pub companionship: f32,
    pub respect: f32,
    pub love: f32,
    pub belonging: f32,
    pub achievement: f32,
    pub autonomy: f32,
    pub purpose: f32,
    pub security: f32,
}

impl Default for SocialRates {
    fn default() -> Self {
        Self {
            companionship: -0.02,
            respect: -0.01,
            love: -0.01,
            belonging: -0.01,
            achievement: -0.015,
            autonomy: -0.005,
            purpose: -0.01,
            security: -0.01,
        }
    }
}

/// Fixed cross-influence coefficients between needs and emotions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossInfluence {
    pub stress_from_hunger: f32,
    pub stress_from_thirst: f32,
    pub stress_from_fatigue: f32,
    /// Stress shed per tick when every survival need is above the comfort threshold.
    pub stress_recovery: f32,
    pub happiness_from_stress: f32,
    pub happiness_from_pain: f32,
    pub fear_from_health: f32,
    pub loneliness_from_companionship: f32,
    pub anger_from_stress: f32,
    /// Fraction of the distance to the personality baseline recovered per tick.
    pub emotion_relaxation: f32,
    /// Extra comfort drain per tick under harsh weather, scaled by severity.
    pub harsh_weather_comfort: f32,
    /// Extra security drain per tick for agents in a poor economic tier.
    pub poverty_security: f32,
}

impl Default for CrossInfluence {
    fn default() -> Self {
        Self {
            stress_from_hunger: 0.05,
            stress_from_thirst: 0.05,
            stress_from_fatigue: 0.04,
            stress_recovery: 0.03,
            happiness_from_stress: 0.04,
            happiness_from_pain: 0.05,
            fear_from_health: 0.05,
            loneliness_from_companionship: 0.05,
            anger_from_stress: 0.03,
            emotion_relaxation: 0.1,
            harsh_weather_comfort: 0.02,
            poverty_security: 0.01,
        }
    }
}

/// Health regeneration, damage, and condition progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Hunger, thirst and fatigue must all exceed this for health to regenerate.
    pub comfort_threshold: f32,
    pub regen_per_tick: f32,
    /// Health lost per tick per unit of the worst deficit.
    pub damage_per_deficit: f32,
    /// Healing multiplier applied to treated injuries.
    pub treated_heal_multiplier: f32,
    /// Severity shed per tick by a treated disease.
    pub disease_regression: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            comfort_threshold: 0.4,
            regen_per_tick: 0.01,
            damage_per_deficit: 0.05,
            treated_heal_multiplier: 2.0,
            disease_regression: 0.02,
        }
    }
}

/// Complete simulation tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub physical: PhysicalRates,
    #[serde(default)]
    pub social: SocialRates,
    #[serde(default)]
    pub influence: CrossInfluence,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub relationships: RelationshipConfig,
    #[serde(default)]
    pub goals: GoalConfig,
    #[serde(default)]
    pub skills: SkillProgressionConfig,
}

impl SimConfig {
    /// Reject tuning that is non-finite or out of its sensible range.
    pub fn validate(&self) -> Result<(), RuleError> {
        let p = &self.physical;
        let s = &self.social;
        let signed = [
            ("physical.hunger", p.hunger),
            ("physical.thirst", p.thirst),
            ("physical.fatigue", p.fatigue),
            ("physical.comfort", p.comfort),
            ("physical.hygiene", p.hygiene),
            ("social.companionship", s.companionship),
            ("social.respect", s.respect),
            ("social.love", s.love),
            ("social.belonging", s.belonging),
            ("social.achievement", s.achievement),
            ("social.autonomy", s.autonomy),
            ("social.purpose", s.purpose),
            ("social.security", s.security),
        ];
        for (field, value) in signed {
            check(field, value, -1.0, 1.0)?;
        }

        let i = &self.influence;
        let h = &self.health;
        let unit_fields = [
            ("physical.temperature_drift", p.temperature_drift),
            ("physical.pain_relief", p.pain_relief),
            ("influence.stress_from_hunger", i.stress_from_hunger),
            ("influence.stress_from_thirst", i.stress_from_thirst),
            ("influence.stress_from_fatigue", i.stress_from_fatigue),
            ("influence.stress_recovery", i.stress_recovery),
            ("influence.happiness_from_stress", i.happiness_from_stress),
            ("influence.happiness_from_pain", i.happiness_from_pain),
            ("influence.fear_from_health", i.fear_from_health),
            ("influence.loneliness_from_companionship", i.loneliness_from_companionship),
            ("influence.anger_from_stress", i.anger_from_stress),
            ("influence.emotion_relaxation", i.emotion_relaxation),
            ("influence.harsh_weather_comfort", i.harsh_weather_comfort),
            ("influence.poverty_security", i.poverty_security),
            ("health.comfort_threshold", h.comfort_threshold),
            ("health.regen_per_tick", h.regen_per_tick),
            ("health.damage_per_deficit", h.damage_per_deficit),
            ("health.disease_regression", h.disease_regression),
        ];
        for (field, value) in unit_fields {
            check(field, value, 0.0, 1.0)?;
        }
        check("health.treated_heal_multiplier", h.treated_heal_multiplier, 1.0, 10.0)?;

        self.memory.validate()?;
        self.relationships.validate()?;
        self.goals.validate()?;
        self.skills.validate()?;
        Ok(())
    }
}

/// Range check shared by the per-module `validate` functions.
pub(crate) fn check(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), RuleError> {
    if crate::common::in_range(value, min, max) {
        Ok(())
    } else {
        Err(RuleError::OutOfRange { field, value })
    }
}
