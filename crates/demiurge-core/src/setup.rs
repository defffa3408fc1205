//! World setup answers and the rules derived from them.
//!
//! The setup wizard collects six answers: world type, the supreme being's
//! identity and purpose, the creation rules, the inhabitants, and the
//! simulation speed. The core only checks that every answer is present;
//! the free-text answers are then mapped onto concrete [`WorldRules`].

use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupremeBeing {
    pub identity: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRules {
    pub time_flow: String,
    pub death_permanence: String,
    pub nature_stability: String,
    pub moral_framework: String,
}

/// Answers from the setup wizard, as submitted in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    pub world_type: String,
    pub supreme_being: SupremeBeing,
    pub creation_rules: CreationRules,
    pub inhabitants: String,
    pub simulation_speed: String,
}

impl SetupConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let setup: Self =
            serde_json::from_str(json).map_err(|e| SimError::Validation(format!("setup: {e}")))?;
        setup.validate()?;
        Ok(setup)
    }

    /// Every answer must be non-blank.
    pub fn validate(&self) -> Result<(), SimError> {
        let answers = [
            ("worldType", &self.world_type),
            ("supremeBeing.identity", &self.supreme_being.identity),
            ("supremeBeing.purpose", &self.supreme_being.purpose),
            ("creationRules.timeFlow", &self.creation_rules.time_flow),
            ("creationRules.deathPermanence", &self.creation_rules.death_permanence),
            ("creationRules.natureStability", &self.creation_rules.nature_stability),
            ("creationRules.moralFramework", &self.creation_rules.moral_framework),
            ("inhabitants", &self.inhabitants),
            ("simulationSpeed", &self.simulation_speed),
        ];
        let missing: Vec<&str> = answers
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SimError::Validation(format!("missing setup answers: {}", missing.join(", "))))
        }
    }

    /// Species named in the inhabitants answer, e.g. "humans, elves and dwarves".
    pub fn species(&self) -> Vec<String> {
        let species: Vec<String> = self
            .inhabitants
            .split([',', ';'])
            .flat_map(|part| part.split(" and "))
            .map(|s| singular(&s.trim().to_lowercase()))
            .filter(|s| !s.is_empty())
            .collect();
        if species.is_empty() {
            vec!["human".to_string()]
        } else {
            species
        }
    }

    pub fn rules(&self) -> WorldRules {
        WorldRules::derive(self)
    }
}

fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ves") {
        format!("{stem}f")
    } else if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Whether the dead are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathPermanence {
    /// Each death is followed by a birth on the next turn.
    Cyclical,
    Permanent,
}

/// Concrete simulation parameters derived from the setup answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldRules {
    /// Decay ticks applied to every agent per turn.
    pub ticks_per_turn: f32,
    /// Calendar days that pass per turn.
    pub days_per_turn: u32,
    pub death: DeathPermanence,
    /// Weather volatility, 0 calm .. 1 chaotic.
    pub volatility: f32,
}

impl Default for WorldRules {
    fn default() -> Self {
        Self {
            ticks_per_turn: 1.0,
            days_per_turn: 7,
            death: DeathPermanence::Permanent,
            volatility: 0.3,
        }
    }
}

fn mentions(answer: &str, words: &[&str]) -> bool {
    let answer = answer.to_lowercase();
    words.iter().any(|w| answer.contains(w))
}

impl WorldRules {
    pub fn derive(setup: &SetupConfig) -> Self {
        let rules = &setup.creation_rules;
        let defaults = Self::default();

        let ticks_per_turn = if mentions(&rules.time_flow, &["slow", "gentle"]) {
            0.5
        } else if mentions(&rules.time_flow, &["fast", "accelerat", "rapid"]) {
            2.0
        } else {
            defaults.ticks_per_turn
        };

        let days_per_turn = if mentions(&setup.simulation_speed, &["epic", "very fast", "ages"]) {
            90
        } else if mentions(&setup.simulation_speed, &["fast", "quick"]) {
            30
        } else if mentions(&setup.simulation_speed, &["slow", "daily"]) {
            1
        } else {
            defaults.days_per_turn
        };

        let death = if mentions(&rules.death_permanence, &["cycl", "reincarn", "rebirth", "return"]) {
            DeathPermanence::Cyclical
        } else {
            DeathPermanence::Permanent
        };

        let volatility = if mentions(&rules.nature_stability, &["chao", "volatile", "wild", "unstable"]) {
            0.8
        } else if mentions(&rules.nature_stability, &["stable", "calm", "ordered"]) {
            0.1
        } else {
            defaults.volatility
        };

        Self {
            ticks_per_turn,
            days_per_turn,
            death,
            volatility,
        }
    }
}
