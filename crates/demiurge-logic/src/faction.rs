//! Faction analytics — power score, status, and member summaries.
//!
//! A faction carries either a legacy scalar summary or an advanced summary
//! with economy, military, technology and stability sub-records. Both shapes
//! live in [`FactionStats`]; every consumer matches on it exhaustively.
//!
//! ```
//! use demiurge_logic::faction::{power_score, Faction, FactionStats, LegacyStats};
//!
//! let alpha = Faction::new(
//!     "Alpha",
//!     FactionStats::Legacy(LegacyStats {
//!         wealth: Some(80.0),
//!         military: Some(60.0),
//!         population: Some(2000.0),
//!     }),
//! );
//! assert!((power_score(&alpha) - 0.48).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId};
use crate::common::in_range;
use crate::error::InvariantBreach;

const DEFAULT_WEALTH: f32 = 50.0;
const DEFAULT_MILITARY: f32 = 50.0;
const DEFAULT_POPULATION: f32 = 1000.0;
const SCORE_MAX: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionEconomy {
    pub wealth: f32,
    #[serde(default)]
    pub trade: f32,
    #[serde(default)]
    pub resources: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionMilitary {
    pub strength: f32,
    #[serde(default)]
    pub morale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionTechnology {
    pub level: f32,
    #[serde(default)]
    pub research: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionStability {
    #[serde(alias = "level")]
    pub overall: f32,
    #[serde(default)]
    pub unrest: f32,
}

/// Scalar summary; any field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyStats {
    pub wealth: Option<f32>,
    pub military: Option<f32>,
    pub population: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub economy: FactionEconomy,
    pub military: FactionMilitary,
    pub technology: FactionTechnology,
    pub stability: FactionStability,
    pub population: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactionStats {
    Legacy(LegacyStats),
    Advanced(AdvancedStats),
}

/// Which shape a faction's stats take, for tagging summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactionShape {
    Legacy,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
    pub alignment: String,
    pub beliefs: Vec<String>,
    pub members: Vec<AgentId>,
    pub stats: FactionStats,
}

/// A scalar an intervention can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactionField {
    Wealth,
    Military,
    Technology,
    Stability,
    Population,
}

impl Faction {
    pub fn new(name: impl Into<String>, stats: FactionStats) -> Self {
        Self {
            name: name.into(),
            alignment: String::new(),
            beliefs: Vec::new(),
            members: Vec::new(),
            stats,
        }
    }

    pub fn shape(&self) -> FactionShape {
        match self.stats {
            FactionStats::Legacy(_) => FactionShape::Legacy,
            FactionStats::Advanced(_) => FactionShape::Advanced,
        }
    }

    /// Current value of `field`, using defaults for unknown legacy values.
    /// Returns `None` for fields the legacy shape does not carry.
    pub fn value(&self, field: FactionField) -> Option<f32> {
        match &self.stats {
            FactionStats::Legacy(s) => match field {
                FactionField::Wealth => Some(s.wealth.unwrap_or(DEFAULT_WEALTH)),
                FactionField::Military => Some(s.military.unwrap_or(DEFAULT_MILITARY)),
                FactionField::Population => Some(s.population.unwrap_or(DEFAULT_POPULATION)),
                FactionField::Technology | FactionField::Stability => None,
            },
            FactionStats::Advanced(s) => Some(match field {
                FactionField::Wealth => s.economy.wealth,
                FactionField::Military => s.military.strength,
                FactionField::Technology => s.technology.level,
                FactionField::Stability => s.stability.overall,
                FactionField::Population => s.population,
            }),
        }
    }

    /// Scores within [0, 100] and a finite, non-negative population.
    pub fn validate(&self) -> Result<(), InvariantBreach> {
        let fields = [
            FactionField::Wealth,
            FactionField::Military,
            FactionField::Technology,
            FactionField::Stability,
        ];
        for field in fields {
            if let Some(value) = self.value(field) {
                if !in_range(value, 0.0, SCORE_MAX) {
                    return Err(InvariantBreach::faction(&self.name, format!("{field:?} = {value} left [0, 100]")));
                }
            }
        }
        if let Some(population) = self.value(FactionField::Population) {
            if !in_range(population, 0.0, f32::MAX) {
                return Err(InvariantBreach::faction(&self.name, format!("population = {population}")));
            }
        }
        Ok(())
    }

    /// Move `field` by `delta`. Scores clamp to [0, 100], population to >= 0.
    /// Returns the change actually applied; fields the shape lacks apply nothing.
    pub fn apply_change(&mut self, field: FactionField, delta: f32) -> f32 {
        let Some(current) = self.value(field) else {
            return 0.0;
        };
        let next = if field == FactionField::Population {
            (current + delta).max(0.0)
        } else {
            (current + delta).clamp(0.0, SCORE_MAX)
        };
        match &mut self.stats {
            FactionStats::Legacy(s) => match field {
                FactionField::Wealth => s.wealth = Some(next),
                FactionField::Military => s.military = Some(next),
                FactionField::Population => s.population = Some(next),
                FactionField::Technology | FactionField::Stability => {}
            },
            FactionStats::Advanced(s) => match field {
                FactionField::Wealth => s.economy.wealth = next,
                FactionField::Military => s.military.strength = next,
                FactionField::Technology => s.technology.level = next,
                FactionField::Stability => s.stability.overall = next,
                FactionField::Population => s.population = next,
            },
        }
        next - current
    }
}

/// Relative standing of a faction, roughly 0..1.
pub fn power_score(faction: &Faction) -> f32 {
    match &faction.stats {
        FactionStats::Advanced(s) => {
            0.30 * (s.economy.wealth / 100.0)
                + 0.25 * (s.military.strength / 100.0)
                + 0.20 * (s.technology.level / 100.0)
                + 0.15 * (s.stability.overall / 100.0)
                + 0.10 * (s.population / 10_000.0)
        }
        FactionStats::Legacy(s) => {
            let wealth = s.wealth.unwrap_or(DEFAULT_WEALTH);
            let military = s.military.unwrap_or(DEFAULT_MILITARY);
            let population = s.population.unwrap_or(DEFAULT_POPULATION);
            0.30 * (wealth / 100.0) + 0.25 * (military / 100.0) + 0.45 * (population / 10_000.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactionStatus {
    Ascendant,
    Stable,
    Struggling,
    Collapsing,
}

impl FactionStatus {
    pub fn from_power(power: f32) -> Self {
        if power >= 0.7 {
            Self::Ascendant
        } else if power >= 0.4 {
            Self::Stable
        } else if power >= 0.2 {
            Self::Struggling
        } else {
            Self::Collapsing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSummary {
    pub name: String,
    pub shape: FactionShape,
    pub power: f32,
    pub status: FactionStatus,
    pub members: usize,
    pub living_members: usize,
    /// Mean happiness of living members; 0 when none are alive.
    pub mean_happiness: f32,
    pub total_wealth: f32,
}

/// Summarize a faction, resolving members through `lookup`.
pub fn summarize<'a>(faction: &Faction, lookup: impl Fn(AgentId) -> Option<&'a Agent>) -> FactionSummary {
    let power = power_score(faction);
    let mut living = 0usize;
    let mut happiness = 0.0;
    let mut wealth = 0.0;
    for agent in faction.members.iter().filter_map(|id| lookup(*id)) {
        wealth += agent.economy.wealth;
        if agent.is_alive() {
            living += 1;
            happiness += agent.emotions.happiness;
        }
    }
    FactionSummary {
        name: faction.name.clone(),
        shape: faction.shape(),
        power,
        status: FactionStatus::from_power(power),
        members: faction.members.len(),
        living_members: living,
        mean_happiness: if living > 0 { happiness / living as f32 } else { 0.0 },
        total_wealth: wealth,
    }
}

/// Military as it appears on the wire: a bare score or a sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MilitaryRecord {
    Score(f32),
    Detail(FactionMilitary),
}

/// Faction as exchanged in JSON. Records carrying all four advanced
/// sub-records, with military as a sub-record, convert to the advanced
/// shape. Anything less, including a partial advanced set, converts to
/// legacy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionRecord {
    pub name: String,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub beliefs: Vec<String>,
    #[serde(default)]
    pub members: Vec<AgentId>,
    #[serde(default)]
    pub wealth: Option<f32>,
    #[serde(default)]
    pub military: Option<MilitaryRecord>,
    #[serde(default)]
    pub population: Option<f32>,
    #[serde(default)]
    pub economy: Option<FactionEconomy>,
    #[serde(default)]
    pub technology: Option<FactionTechnology>,
    #[serde(default)]
    pub stability: Option<FactionStability>,
}

impl From<FactionRecord> for Faction {
    fn from(record: FactionRecord) -> Self {
        let stats = match (record.economy, record.military, record.technology, record.stability) {
            (Some(economy), Some(MilitaryRecord::Detail(military)), Some(technology), Some(stability)) => {
                FactionStats::Advanced(AdvancedStats {
                    economy,
                    military,
                    technology,
                    stability,
                    population: record.population.unwrap_or(DEFAULT_POPULATION),
                })
            }
            (economy, military, _, _) => FactionStats::Legacy(LegacyStats {
                wealth: record.wealth.or(economy.map(|e| e.wealth)),
                military: military.map(|m| match m {
                    MilitaryRecord::Score(score) => score,
                    MilitaryRecord::Detail(detail) => detail.strength,
                }),
                population: record.population,
            }),
        };
        Self {
            name: record.name,
            alignment: record.alignment,
            beliefs: record.beliefs,
            members: record.members,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Personality;

    fn advanced() -> AdvancedStats {
        AdvancedStats {
            economy: FactionEconomy {
                wealth: 100.0,
                trade: 50.0,
                resources: 50.0,
            },
            military: FactionMilitary {
                strength: 100.0,
                morale: 50.0,
            },
            technology: FactionTechnology {
                level: 100.0,
                research: 10.0,
            },
            stability: FactionStability {
                overall: 100.0,
                unrest: 0.0,
            },
            population: 10_000.0,
        }
    }

    #[test]
    fn test_legacy_defaults() {
        let f = Faction::new("Beta", FactionStats::Legacy(LegacyStats::default()));
        // 0.3*0.5 + 0.25*0.5 + 0.45*0.1
        assert!((power_score(&f) - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_advanced_maximum() {
        let f = Faction::new("Gamma", FactionStats::Advanced(advanced()));
        assert!((power_score(&f) - 1.0).abs() < 1e-6);
        assert_eq!(FactionStatus::from_power(power_score(&f)), FactionStatus::Ascendant);
    }

    #[test]
    fn test_change_clamps() {
        let mut f = Faction::new(
            "Alpha",
            FactionStats::Legacy(LegacyStats {
                wealth: Some(15.0),
                ..LegacyStats::default()
            }),
        );
        assert_eq!(f.apply_change(FactionField::Wealth, -20.0), -15.0);
        assert_eq!(f.value(FactionField::Wealth), Some(0.0));
        assert_eq!(f.apply_change(FactionField::Military, 80.0), 50.0);
        assert_eq!(f.apply_change(FactionField::Technology, 5.0), 0.0);
        f.apply_change(FactionField::Population, 1e6);
        assert_eq!(f.value(FactionField::Population), Some(1_001_000.0));
    }

    #[test]
    fn test_validate_rejects_unbounded_population() {
        let mut f = Faction::new("Alpha", FactionStats::Legacy(LegacyStats::default()));
        assert!(f.validate().is_ok());
        f.apply_change(FactionField::Population, f32::MAX);
        f.apply_change(FactionField::Population, f32::MAX);
        let breach = f.validate().unwrap_err();
        assert_eq!(breach.subject, "faction Alpha");
    }

    #[test]
    fn test_record_without_advanced_fields_is_legacy() {
        let json = r#"{"name": "Alpha", "wealth": 80, "military": 60, "population": 2000}"#;
        let record: FactionRecord = serde_json::from_str(json).unwrap();
        let faction = Faction::from(record);
        assert_eq!(faction.shape(), FactionShape::Legacy);
        assert!((power_score(&faction) - 0.48).abs() < 1e-6);
    }

    #[test]
    fn test_record_with_advanced_fields() {
        let json = r#"{
            "name": "Gamma",
            "economy": {"wealth": 100, "trade": 50, "resources": 50},
            "military": {"strength": 100, "morale": 50},
            "technology": {"level": 100, "research": 10},
            "stability": {"level": 100, "unrest": 0},
            "population": 10000
        }"#;
        let record: FactionRecord = serde_json::from_str(json).unwrap();
        let faction = Faction::from(record);
        assert_eq!(faction.stats, FactionStats::Advanced(advanced()));
    }

    #[test]
    fn test_record_with_overall_stability_and_sparse_sub_records() {
        let json = r#"{
            "name": "Delta",
            "economy": {"wealth": 100},
            "military": {"strength": 100},
            "technology": {"level": 100},
            "stability": {"overall": 70},
            "population": 10000
        }"#;
        let record: FactionRecord = serde_json::from_str(json).unwrap();
        let faction = Faction::from(record);
        let FactionStats::Advanced(stats) = &faction.stats else {
            panic!("expected advanced shape");
        };
        assert_eq!(stats.stability.overall, 70.0);
        assert_eq!(stats.economy.trade, 0.0);
        // 0.3 + 0.25 + 0.2 + 0.15*0.7 + 0.1
        assert!((power_score(&faction) - 0.955).abs() < 1e-6);
    }

    #[test]
    fn test_partial_advanced_record_is_legacy() {
        let json = r#"{"name": "Alpha", "economy": {"wealth": 80}, "military": 60, "population": 2000}"#;
        let record: FactionRecord = serde_json::from_str(json).unwrap();
        let faction = Faction::from(record);
        assert_eq!(faction.shape(), FactionShape::Legacy);
        assert_eq!(faction.value(FactionField::Wealth), Some(80.0));
        assert!((power_score(&faction) - 0.48).abs() < 1e-6);
    }

    #[test]
    fn test_summary_counts_living_members() {
        let mut a = Agent::new(1, "Ada", "human", 0, Personality::default());
        let mut b = Agent::new(2, "Bram", "human", 0, Personality::default());
        a.emotions.happiness = 0.8;
        b.die(3, crate::agent::DeathCause::Health);
        let mut faction = Faction::new("Alpha", FactionStats::Legacy(LegacyStats::default()));
        faction.members = vec![1, 2, 9];
        let agents = [a, b];
        let summary = summarize(&faction, |id| agents.iter().find(|x| x.id() == id));
        assert_eq!(summary.members, 3);
        assert_eq!(summary.living_members, 1);
        assert!((summary.mean_happiness - 0.8).abs() < 1e-6);
        assert_eq!(summary.total_wealth, 100.0);
        assert_eq!(summary.status, FactionStatus::Struggling);
    }
}
