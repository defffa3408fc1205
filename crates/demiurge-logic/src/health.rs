//! Health record, condition progression, and death determination.
//!
//! Health never regenerates on its own account: it recovers only while
//! hunger, thirst and fatigue sit above the comfort threshold and no
//! untreated injury or disease is active. Otherwise it erodes in proportion
//! to the worst deficit the agent is carrying.

use serde::{Deserialize, Serialize};

use crate::agent::{DeathCause, PhysicalNeeds, Turn};
use crate::common::{in_range, unit};
use crate::config::HealthConfig;

/// Severity tiers derived from the health need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjurySeverity {
    /// Health >= 0.7.
    Healthy,
    /// Health 0.4..0.7.
    Light,
    /// Health 0.2..0.4.
    Moderate,
    /// Health < 0.2.
    Critical,
}

impl InjurySeverity {
    pub fn from_health(health: f32) -> Self {
        if health >= 0.7 {
            Self::Healthy
        } else if health >= 0.4 {
            Self::Light
        } else if health >= 0.2 {
            Self::Moderate
        } else {
            Self::Critical
        }
    }

    pub fn needs_care(self) -> bool {
        !matches!(self, Self::Healthy)
    }
}

/// A wound that heals at its own rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Injury {
    pub kind: String,
    /// 0.0 healed .. 1.0 maximal.
    pub severity: f32,
    /// Severity removed per tick.
    pub healing_rate: f32,
    pub treated: bool,
}

impl Injury {
    pub fn new(kind: impl Into<String>, severity: f32, healing_rate: f32) -> Self {
        Self {
            kind: kind.into(),
            severity: unit(severity),
            healing_rate: healing_rate.max(0.0),
            treated: false,
        }
    }
}

/// An illness that worsens until treated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    pub name: String,
    pub severity: f32,
    /// Severity gained per tick while untreated, before immunity.
    pub progression_rate: f32,
    pub treated: bool,
}

impl Disease {
    pub fn new(name: impl Into<String>, severity: f32, progression_rate: f32) -> Self {
        Self {
            name: name.into(),
            severity: unit(severity),
            progression_rate: progression_rate.max(0.0),
            treated: false,
        }
    }
}

/// Active conditions plus innate resistance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub injuries: Vec<Injury>,
    pub diseases: Vec<Disease>,
    pub genetic_traits: Vec<String>,
    /// 0.0 defenceless .. 1.0 immune.
    pub immune_strength: f32,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self {
            injuries: Vec::new(),
            diseases: Vec::new(),
            genetic_traits: Vec::new(),
            immune_strength: 0.5,
        }
    }
}

impl HealthRecord {
    pub fn has_untreated_condition(&self) -> bool {
        self.injuries.iter().any(|i| !i.treated) || self.diseases.iter().any(|d| !d.treated)
    }

    /// Highest severity among all active conditions.
    pub fn worst_condition(&self) -> f32 {
        self.injuries
            .iter()
            .map(|i| i.severity)
            .chain(self.diseases.iter().map(|d| d.severity))
            .fold(0.0, f32::max)
    }

    /// Worst injury severity, which drives pain.
    pub fn worst_injury(&self) -> f32 {
        self.injuries.iter().map(|i| i.severity).fold(0.0, f32::max)
    }

    pub fn treat_all(&mut self) {
        for injury in &mut self.injuries {
            injury.treated = true;
        }
        for disease in &mut self.diseases {
            disease.treated = true;
        }
    }

    /// Heal injuries and progress or regress diseases by `ticks`.
    /// Conditions that reach zero severity are removed.
    pub fn progress(&mut self, ticks: f32, config: &HealthConfig) {
        for injury in &mut self.injuries {
            let rate = if injury.treated {
                injury.healing_rate * config.treated_heal_multiplier
            } else {
                injury.healing_rate
            };
            injury.severity = unit(injury.severity - rate * ticks);
        }
        self.injuries.retain(|i| i.severity > 0.0);

        let resistance = 1.0 - unit(self.immune_strength);
        for disease in &mut self.diseases {
            let delta = if disease.treated {
                -config.disease_regression
            } else {
                disease.progression_rate * resistance
            };
            disease.severity = unit(disease.severity + delta * ticks);
        }
        self.diseases.retain(|d| d.severity > 0.0);
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !in_range(self.immune_strength, 0.0, 1.0) {
            return Err(format!("immune_strength = {}", self.immune_strength));
        }
        for injury in &self.injuries {
            if !in_range(injury.severity, 0.0, 1.0) {
                return Err(format!("injury {} severity = {}", injury.kind, injury.severity));
            }
        }
        for disease in &self.diseases {
            if !in_range(disease.severity, 0.0, 1.0) {
                return Err(format!("disease {} severity = {}", disease.name, disease.severity));
            }
        }
        Ok(())
    }
}

/// Compute the new health value after `ticks`.
///
/// - Regenerates by `regen_per_tick` when hunger, thirst and fatigue are all
///   above `comfort_threshold` and nothing untreated is active.
/// - Otherwise decays by `damage_per_deficit × worst deficit`, where the
///   worst deficit also counts the most severe active condition.
pub fn compute_health(
    needs: &PhysicalNeeds,
    record: &HealthRecord,
    ticks: f32,
    config: &HealthConfig,
) -> f32 {
    let health = needs.health;
    if needs.survival_above(config.comfort_threshold) && !record.has_untreated_condition() {
        return unit(health + config.regen_per_tick * ticks);
    }
    let deficit = needs.worst_survival_deficit().max(record.worst_condition());
    unit(health - config.damage_per_deficit * deficit * ticks)
}

pub fn is_dead(health: f32) -> bool {
    health <= 0.0
}

/// Why an agent of this health and age should die now, if at all.
pub fn cause_of_death(needs: &PhysicalNeeds, age: Turn, life_expectancy: Turn) -> Option<DeathCause> {
    if is_dead(needs.health) {
        Some(DeathCause::Health)
    } else if age > life_expectancy {
        Some(DeathCause::OldAge)
    } else {
        None
    }
}

/// Sadness added to (close, distant) acquaintances of someone who died.
pub fn grief_impact() -> (f32, f32) {
    (0.3, 0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injury_severity_tiers() {
        assert_eq!(InjurySeverity::from_health(1.0), InjurySeverity::Healthy);
        assert_eq!(InjurySeverity::from_health(0.7), InjurySeverity::Healthy);
        assert_eq!(InjurySeverity::from_health(0.69), InjurySeverity::Light);
        assert_eq!(InjurySeverity::from_health(0.39), InjurySeverity::Moderate);
        assert_eq!(InjurySeverity::from_health(0.19), InjurySeverity::Critical);
        assert!(!InjurySeverity::Healthy.needs_care());
        assert!(InjurySeverity::Critical.needs_care());
    }

    #[test]
    fn test_regenerates_when_fed_and_rested() {
        let needs = PhysicalNeeds {
            health: 0.6,
            ..PhysicalNeeds::default()
        };
        let h = compute_health(&needs, &HealthRecord::default(), 1.0, &HealthConfig::default());
        assert!((h - 0.61).abs() < 1e-5);
    }

    #[test]
    fn test_untreated_injury_blocks_regeneration() {
        let needs = PhysicalNeeds {
            health: 0.6,
            ..PhysicalNeeds::default()
        };
        let mut record = HealthRecord::default();
        record.injuries.push(Injury::new("broken arm", 0.4, 0.01));
        let h = compute_health(&needs, &record, 1.0, &HealthConfig::default());
        // 0.05 * 0.4 = 0.02 lost
        assert!((h - 0.58).abs() < 1e-5);
    }

    #[test]
    fn test_starvation_erodes_health() {
        let needs = PhysicalNeeds {
            health: 0.5,
            hunger: 0.0,
            ..PhysicalNeeds::default()
        };
        let h = compute_health(&needs, &HealthRecord::default(), 2.0, &HealthConfig::default());
        assert!((h - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_health_never_leaves_range() {
        let needs = PhysicalNeeds {
            health: 0.01,
            hunger: 0.0,
            thirst: 0.0,
            ..PhysicalNeeds::default()
        };
        let h = compute_health(&needs, &HealthRecord::default(), 100.0, &HealthConfig::default());
        assert_eq!(h, 0.0);
        assert!(is_dead(h));
    }

    #[test]
    fn test_cause_of_death() {
        let mut needs = PhysicalNeeds::default();
        assert_eq!(cause_of_death(&needs, 10, 100), None);
        assert_eq!(cause_of_death(&needs, 101, 100), Some(DeathCause::OldAge));
        needs.health = 0.0;
        assert_eq!(cause_of_death(&needs, 101, 100), Some(DeathCause::Health));
    }

    #[test]
    fn test_treated_injury_heals_faster_and_is_removed() {
        let config = HealthConfig::default();
        let mut record = HealthRecord::default();
        record.injuries.push(Injury::new("cut", 0.1, 0.02));
        record.injuries.push(Injury::new("bruise", 0.1, 0.02));
        record.injuries[0].treated = true;
        record.progress(2.0, &config);
        // treated: 0.1 - 0.08 = 0.02; untreated: 0.1 - 0.04 = 0.06
        assert_eq!(record.injuries.len(), 2);
        assert!(record.injuries[0].severity < record.injuries[1].severity);
        record.progress(5.0, &config);
        assert!(record.injuries.is_empty());
    }

    #[test]
    fn test_disease_progression_depends_on_immunity() {
        let config = HealthConfig::default();
        let mut weak = HealthRecord {
            immune_strength: 0.0,
            ..HealthRecord::default()
        };
        let mut strong = HealthRecord {
            immune_strength: 0.9,
            ..HealthRecord::default()
        };
        weak.diseases.push(Disease::new("fever", 0.2, 0.05));
        strong.diseases.push(Disease::new("fever", 0.2, 0.05));
        weak.progress(1.0, &config);
        strong.progress(1.0, &config);
        assert!(weak.diseases[0].severity > strong.diseases[0].severity);

        weak.treat_all();
        let before = weak.diseases[0].severity;
        weak.progress(1.0, &config);
        assert!(weak.diseases[0].severity < before);
    }
}
