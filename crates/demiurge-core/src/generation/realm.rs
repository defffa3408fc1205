//! Regions, factions and the founding faith.

use demiurge_logic::common::Vec3;
use demiurge_logic::faction::{
    AdvancedStats, Faction, FactionEconomy, FactionMilitary, FactionStability, FactionStats,
    FactionTechnology, LegacyStats,
};
use rand::Rng;

use super::names::faction_name;
use crate::setup::SetupConfig;
use crate::world::{BeliefSystem, Region};

static TEMPERATE: &[(&str, &str)] = &[
    ("The Greenreach", "temperate"),
    ("Highmoor", "cold"),
    ("The Sunward Coast", "warm"),
    ("Mirefall", "wet"),
    ("The Stonespine", "alpine"),
];

static HARSH: &[(&str, &str)] = &[
    ("The Ashlands", "arid"),
    ("Frostmark", "frozen"),
    ("The Shattered Reach", "volcanic"),
    ("Duskwater", "marsh"),
];

/// Regions laid out on a ring, flavored by the world type.
pub fn regions(setup: &SetupConfig, rng: &mut impl Rng) -> Vec<Region> {
    let world_type = setup.world_type.to_lowercase();
    let table = if ["harsh", "dark", "wasteland", "grim"].iter().any(|w| world_type.contains(w)) {
        HARSH
    } else {
        TEMPERATE
    };
    let count = rng.gen_range(3..=table.len());
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let (name, climate) = table[i];
            Region {
                name: name.to_string(),
                climate: climate.to_string(),
                center: Vec3::new(100.0 * angle.cos(), 100.0 * angle.sin(), 0.0),
            }
        })
        .collect()
}

fn advanced_stats(rng: &mut impl Rng) -> AdvancedStats {
    AdvancedStats {
        economy: FactionEconomy {
            wealth: rng.gen_range(30.0..80.0),
            trade: rng.gen_range(20.0..70.0),
            resources: rng.gen_range(20.0..80.0),
        },
        military: FactionMilitary {
            strength: rng.gen_range(20.0..80.0),
            morale: rng.gen_range(40.0..90.0),
        },
        technology: FactionTechnology {
            level: rng.gen_range(10.0..60.0),
            research: rng.gen_range(0.0..20.0),
        },
        stability: FactionStability {
            overall: rng.gen_range(40.0..90.0),
            unrest: rng.gen_range(0.0..30.0),
        },
        population: rng.gen_range(500.0..5000.0),
    }
}

/// Founding factions, alternating between the advanced and legacy shapes.
pub fn factions(count: usize, setup: &SetupConfig, rng: &mut impl Rng) -> Vec<Faction> {
    let mut taken: Vec<String> = Vec::with_capacity(count);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let name = faction_name(rng, &taken);
        taken.push(name.clone());
        let stats = if i % 2 == 0 {
            FactionStats::Advanced(advanced_stats(rng))
        } else {
            FactionStats::Legacy(LegacyStats {
                wealth: Some(rng.gen_range(30.0..80.0)),
                military: rng.gen_bool(0.8).then(|| rng.gen_range(20.0..80.0)),
                population: Some(rng.gen_range(500.0..5000.0)),
            })
        };
        let mut faction = Faction::new(name, stats);
        faction.alignment = setup.creation_rules.moral_framework.clone();
        out.push(faction);
    }
    out
}

/// The faith of the supreme being, with tenets drawn from the setup answers.
pub fn founding_faith(setup: &SetupConfig) -> BeliefSystem {
    let being = &setup.supreme_being;
    BeliefSystem {
        name: format!("The Faith of {}", being.identity),
        deity: being.identity.clone(),
        tenets: vec![
            format!("We exist {}", being.purpose),
            format!("The world is bound by {}", setup.creation_rules.moral_framework),
            format!("Death is {}", setup.creation_rules.death_permanence),
        ],
        adherents: Vec::new(),
    }
}
