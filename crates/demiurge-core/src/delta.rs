//! World delta — what one committed turn changed, as handed to the narrator.

use demiurge_logic::agent::{AgentId, DeathCause, Turn};
use demiurge_logic::crossings::AgentCrossing;
use demiurge_logic::faction::{power_score, Faction, FactionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionDelta {
    pub name: String,
    pub power_before: f32,
    pub power_after: f32,
    pub status_before: FactionStatus,
    pub status_after: FactionStatus,
}

impl FactionDelta {
    /// Compare a faction before and after a turn. A faction new this turn
    /// reports its current power on both sides.
    pub fn between(before: Option<&Faction>, after: &Faction) -> Self {
        let power_after = power_score(after);
        let power_before = before.map_or(power_after, power_score);
        Self {
            name: after.name.clone(),
            power_before,
            power_after,
            status_before: FactionStatus::from_power(power_before),
            status_after: FactionStatus::from_power(power_after),
        }
    }

    pub fn changed(&self) -> bool {
        self.power_before != self.power_after
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Death {
    pub agent: AgentId,
    pub name: String,
    pub cause: DeathCause,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDelta {
    /// The turn this delta committed.
    pub turn: Turn,
    pub intervention: Option<String>,
    pub factions: Vec<FactionDelta>,
    pub crossings: Vec<AgentCrossing>,
    pub environment: String,
    pub births: Vec<AgentId>,
    pub deaths: Vec<Death>,
    pub events: Vec<String>,
}

impl WorldDelta {
    /// Whether anything worth narrating happened beyond the passage of time.
    pub fn is_quiet(&self) -> bool {
        self.crossings.is_empty()
            && self.births.is_empty()
            && self.deaths.is_empty()
            && self.events.is_empty()
            && self.factions.iter().all(|f| !f.changed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demiurge_logic::faction::{FactionField, FactionStats, LegacyStats};

    #[test]
    fn test_faction_delta_tracks_power() {
        let before = Faction::new("Alpha", FactionStats::Legacy(LegacyStats::default()));
        let mut after = before.clone();
        after.apply_change(FactionField::Wealth, -50.0);
        let delta = FactionDelta::between(Some(&before), &after);
        assert!((delta.power_before - 0.32).abs() < 1e-6);
        assert!((delta.power_after - 0.17).abs() < 1e-6);
        assert_eq!(delta.status_after, FactionStatus::Collapsing);
        assert!(delta.changed());
    }

    #[test]
    fn test_default_delta_is_quiet() {
        assert!(WorldDelta::default().is_quiet());
    }
}
