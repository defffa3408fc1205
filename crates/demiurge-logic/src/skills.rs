//! Skill practice, experience gain, and decay from disuse.
//!
//! Skills are keyed by name. Practice raises the level with diminishing
//! returns above a threshold and a multiplier from innate talent. A skill
//! left unused for longer than `unused_threshold` turns loses level at its
//! own decay rate, down to zero.
//!
//! ```
//! use demiurge_logic::skills::{SkillProgressionConfig, SkillSet};
//!
//! let config = SkillProgressionConfig::default();
//! let mut skills = SkillSet::default();
//! let level = skills.practice("smithing", 10.0, 3, &config);
//! assert!(level > 0.0);
//! assert_eq!(skills.get("smithing").unwrap().last_used, 3);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::Turn;
use crate::common::{in_range, unit};
use crate::config::check;
use crate::error::RuleError;

/// One named skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Current level, 0.0 up to the configured cap.
    pub level: f32,
    /// Ticks of accumulated practice.
    pub experience: f32,
    /// Innate aptitude in [0, 1]; scales gain.
    pub talent: f32,
    pub last_used: Turn,
    /// Level lost per tick once unused past the threshold.
    pub decay_rate: f32,
}

impl Skill {
    pub fn new(level: f32, talent: f32, last_used: Turn) -> Self {
        Self {
            level: level.max(0.0),
            experience: 0.0,
            talent: unit(talent),
            last_used,
            decay_rate: 0.002,
        }
    }
}

/// Tuning for skill progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProgressionConfig {
    /// Base level gain per tick of practice.
    pub base_gain_per_tick: f32,
    /// Level above which diminishing returns kick in.
    pub diminishing_threshold: f32,
    /// Maximum level achievable through practice.
    pub skill_cap: f32,
    /// Turns without use before decay begins.
    pub unused_threshold: Turn,
}

impl Default for SkillProgressionConfig {
    fn default() -> Self {
        Self {
            base_gain_per_tick: 0.01,
            diminishing_threshold: 0.8,
            skill_cap: 1.0,
            unused_threshold: 10,
        }
    }
}

impl SkillProgressionConfig {
    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        check("skills.base_gain_per_tick", self.base_gain_per_tick, 0.0, 1.0)?;
        check("skills.skill_cap", self.skill_cap, 0.0, 100.0)?;
        check(
            "skills.diminishing_threshold",
            self.diminishing_threshold,
            0.0,
            self.skill_cap,
        )
    }
}

/// All skills an agent has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillSet {
    skills: BTreeMap<String, Skill>,
}

impl SkillSet {
    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    pub fn level(&self, name: &str) -> f32 {
        self.skills.get(name).map_or(0.0, |s| s.level)
    }

    pub fn insert(&mut self, name: impl Into<String>, skill: Skill) {
        self.skills.insert(name.into(), skill);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Skill)> {
        self.skills.iter()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Practice a skill for `ticks`, creating it at level 0 if unknown.
    /// Returns the new level.
    ///
    /// Gain = `base × ticks × (0.5 + talent) × diminishing`, where the
    /// diminishing factor falls linearly from 1 at the threshold to 0 at the cap.
    pub fn practice(
        &mut self,
        name: &str,
        ticks: f32,
        now: Turn,
        config: &SkillProgressionConfig,
    ) -> f32 {
        let skill = self
            .skills
            .entry(name.to_string())
            .or_insert_with(|| Skill::new(0.0, 0.5, now));
        skill.last_used = skill.last_used.max(now);
        skill.experience += ticks.max(0.0);

        if skill.level >= config.skill_cap {
            return skill.level;
        }

        let diminishing = if skill.level > config.diminishing_threshold {
            let range = config.skill_cap - config.diminishing_threshold;
            if range > 0.0 {
                1.0 - (skill.level - config.diminishing_threshold) / range
            } else {
                0.0
            }
        } else {
            1.0
        };

        let gain = config.base_gain_per_tick * ticks.max(0.0) * (0.5 + skill.talent) * diminishing.max(0.01);
        skill.level = (skill.level + gain).min(config.skill_cap);
        skill.level
    }

    /// Decay every skill unused for longer than the threshold.
    pub fn decay_unused(&mut self, now: Turn, ticks: f32, config: &SkillProgressionConfig) {
        for skill in self.skills.values_mut() {
            if now.saturating_sub(skill.last_used) > config.unused_threshold {
                skill.level = (skill.level - skill.decay_rate * ticks).max(0.0);
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for (name, skill) in &self.skills {
            if !skill.level.is_finite() || skill.level < 0.0 {
                return Err(format!("skill {name} level = {}", skill.level));
            }
            if !in_range(skill.talent, 0.0, 1.0) {
                return Err(format!("skill {name} talent = {}", skill.talent));
            }
        }
        Ok(())
    }
}
