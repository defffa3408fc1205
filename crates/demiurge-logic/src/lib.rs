//! Pure agent simulation logic for Demiurge.
//!
//! This crate holds every rule that acts on a single agent or a single
//! faction, with no world container, storage, or randomness of its own.
//! Functions take plain data and return results, which keeps them
//! unit-testable and lets the core crate compose them into turns.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Agent record: identity, personality, emotions, needs, vitality |
//! | [`common`] | `Vec3` and range-clamping helpers |
//! | [`config`] | `SimConfig` tuning tables and validation |
//! | [`crossings`] | Threshold crossings between two agent snapshots |
//! | [`decay`] | Per-tick need, health, stress and emotion decay |
//! | [`economy`] | Possessions, wealth, ledgers, economic tier |
//! | [`environment`] | Calendar, seeded weather step, ecosystem drift |
//! | [`error`] | `RuleError` and `InvariantBreach` |
//! | [`faction`] | Faction shapes, power score, summaries, wire records |
//! | [`goals`] | Urgency, scoring, active cap, explicit progress |
//! | [`health`] | Injuries, diseases, health regeneration, death |
//! | [`memory`] | Importance-weighted memory with working/long-term sets |
//! | [`relationship`] | Paired relationship updates from shared events |
//! | [`skills`] | Practice, talent, diminishing returns, disuse decay |

pub mod agent;
pub mod common;
pub mod config;
pub mod crossings;
pub mod decay;
pub mod economy;
pub mod environment;
pub mod error;
pub mod faction;
pub mod goals;
pub mod health;
pub mod memory;
pub mod relationship;
pub mod skills;
