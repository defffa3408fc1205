//! Name generation utilities

use rand::Rng;

/// Generate a random "Given Family" name.
pub fn generate_name(rng: &mut impl Rng) -> String {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];
    format!("{given} {family}")
}

/// Pick a faction name not already in `taken`, falling back to a numbered one.
pub fn faction_name(rng: &mut impl Rng, taken: &[String]) -> String {
    let free: Vec<&str> = FACTION_NAMES
        .iter()
        .copied()
        .filter(|n| !taken.iter().any(|t| t == n))
        .collect();
    if free.is_empty() {
        format!("House {}", taken.len() + 1)
    } else {
        free[rng.gen_range(0..free.len())].to_string()
    }
}

static GIVEN_NAMES: &[&str] = &[
    // Plain
    "Ada",
    "Bram",
    "Cora",
    "Dain",
    "Edda",
    "Finn",
    "Greta",
    "Hal",
    "Isolde",
    "Jory",
    "Kess",
    "Lorne",
    "Mara",
    "Nils",
    "Orla",
    "Pell",
    // Old tongue
    "Aelric",
    "Brisa",
    "Caedmon",
    "Deirwen",
    "Eamon",
    "Fianna",
    "Gwyn",
    "Halvard",
    "Ilse",
    "Jarrah",
    "Kaelen",
    "Liesl",
    "Maelis",
    "Nerys",
    "Oswin",
    "Rhosyn",
    // Lofty
    "Aurelian",
    "Celestine",
    "Evander",
    "Isaura",
    "Lucan",
    "Seraphine",
    "Thalia",
    "Valen",
];

static FAMILY_NAMES: &[&str] = &[
    // Trades
    "Smith",
    "Cooper",
    "Fletcher",
    "Mason",
    "Thatcher",
    "Weaver",
    "Miller",
    "Tanner",
    // Places
    "Ashford",
    "Blackwater",
    "Coldbrook",
    "Dunmore",
    "Elmstead",
    "Fairholm",
    "Greyhill",
    "Hollowmere",
    "Ironwood",
    "Larkspur",
    "Marsh",
    "Northcott",
    // Compound
    "Stormborn",
    "Oakenshield",
    "Brightwater",
    "Thornfield",
    "Ravenscar",
    "Silverleaf",
];

static FACTION_NAMES: &[&str] = &[
    "The Ember Court",
    "The Tidewardens",
    "The Iron Compact",
    "The Verdant Circle",
    "The Ashen Throne",
    "The Lantern Guild",
    "The Free Holds",
    "The Starwatch",
];
