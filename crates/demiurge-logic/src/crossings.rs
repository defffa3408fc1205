//! Threshold crossings between two snapshots of the same agent.
//!
//! A turn's world delta does not list every value that moved; it lists the
//! moments worth narrating: a need falling into crisis or recovering, a
//! change of health tier or economic tier, a relationship changing kind.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, NeedKind};
use crate::decay::need_levels;
use crate::economy::EconomicTier;
use crate::health::InjurySeverity;
use crate::relationship::RelationshipKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Crossing {
    NeedCritical { need: NeedKind },
    NeedRecovered { need: NeedKind },
    HealthTier { from: InjurySeverity, to: InjurySeverity },
    EconomicTier { from: EconomicTier, to: EconomicTier },
    Relationship { other: AgentId, from: RelationshipKind, to: RelationshipKind },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCrossing {
    pub agent: AgentId,
    pub crossing: Crossing,
}

/// Compare `before` and `after`, reporting needs that crossed `critical`
/// in either direction and any tier or relationship-kind changes.
pub fn detect(before: &Agent, after: &Agent, critical: f32) -> Vec<AgentCrossing> {
    let agent = after.id();
    let mut found = Vec::new();
    let mut push = |crossing| found.push(AgentCrossing { agent, crossing });

    for ((need, was), (_, now)) in need_levels(before).into_iter().zip(need_levels(after)) {
        if was >= critical && now < critical {
            push(Crossing::NeedCritical { need });
        } else if was < critical && now >= critical {
            push(Crossing::NeedRecovered { need });
        }
    }

    let (from, to) = (
        InjurySeverity::from_health(before.needs.health),
        InjurySeverity::from_health(after.needs.health),
    );
    if from != to {
        push(Crossing::HealthTier { from, to });
    }

    let (from, to) = (before.economy.tier, after.economy.tier);
    if from != to {
        push(Crossing::EconomicTier { from, to });
    }

    for (other, rel) in after.relationships() {
        let from = before
            .relationship(*other)
            .map_or(RelationshipKind::Stranger, |r| r.kind);
        if from != rel.kind {
            push(Crossing::Relationship {
                other: *other,
                from,
                to: rel.kind,
            });
        }
    }
    found
}
