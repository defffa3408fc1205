//! Need and emotion decay — advances one agent by `n` ticks.
//!
//! Order within one call:
//! 1. physical and social needs move by their signed rates (harsh weather
//!    and poverty add extra drain), thermal comfort drifts toward the ambient
//!    target;
//! 2. injuries and diseases progress, pain follows the worst injury, and
//!    health regenerates or erodes;
//! 3. stress accumulates from survival deficits;
//! 4. emotions relax toward the personality baseline, then take the
//!    cross-influences of stress, pain, health and companionship;
//! 5. energy and motivation are re-derived.
//!
//! Every value is clamped after it moves. Out-of-range input is a caller
//! bug: debug builds assert on it, release builds clamp.
//!
//! ```
//! use demiurge_logic::agent::{Agent, Personality};
//! use demiurge_logic::config::SimConfig;
//! use demiurge_logic::decay::advance_agent;
//! use demiurge_logic::environment::Ambient;
//!
//! let mut agent = Agent::new(1, "Ada", "human", 0, Personality::default());
//! advance_agent(&mut agent, 1.0, &Ambient::default(), &SimConfig::default());
//! assert!((agent.needs.hunger - 0.96).abs() < 1e-6);
//! ```

use crate::agent::{Activity, Agent, NeedKind, Turn};
use crate::common::unit;
use crate::config::SimConfig;
use crate::environment::Ambient;
use crate::goals::GoalKind;
use crate::health::{compute_health, InjurySeverity};
use crate::memory::MemoryKind;

/// Turns a loss keeps an agent in mourning.
const MOURNING_TURNS: Turn = 3;
const REST_BELOW: f32 = 0.25;
const LONELY_BELOW: f32 = 0.3;

/// Advance one living agent by `ticks`. Deceased agents are left untouched.
pub fn advance_agent(agent: &mut Agent, ticks: f32, ambient: &Ambient, config: &SimConfig) {
    debug_assert!(agent.bounds_hold(), "agent {} entered decay out of range", agent.id());
    if !agent.is_alive() {
        return;
    }
    let t = ticks.max(0.0);
    decay_needs(agent, t, ambient, config);
    update_health(agent, t, config);
    update_stress(agent, t, config);
    update_emotions(agent, t, config);
    derive_drive(agent);
}

fn decay_needs(agent: &mut Agent, t: f32, ambient: &Ambient, config: &SimConfig) {
    let rates = &config.physical;
    let harsh = config.influence.harsh_weather_comfort * ambient.harshness;
    let n = &mut agent.needs;
    n.hunger = unit(n.hunger + rates.hunger * t);
    n.thirst = unit(n.thirst + rates.thirst * t);
    n.fatigue = unit(n.fatigue + rates.fatigue * t);
    n.comfort = unit(n.comfort + (rates.comfort - harsh) * t);
    n.hygiene = unit(n.hygiene + rates.hygiene * t);
    let drift = unit(rates.temperature_drift * t);
    n.temperature = unit(n.temperature + (ambient.thermal_target() - n.temperature) * drift);

    let social = &config.social;
    let poverty = if agent.economy.tier.is_precarious() {
        config.influence.poverty_security
    } else {
        0.0
    };
    let s = &mut agent.social;
    s.companionship = unit(s.companionship + social.companionship * t);
    s.respect = unit(s.respect + social.respect * t);
    s.love = unit(s.love + social.love * t);
    s.belonging = unit(s.belonging + social.belonging * t);
    s.achievement = unit(s.achievement + social.achievement * t);
    s.autonomy = unit(s.autonomy + social.autonomy * t);
    s.purpose = unit(s.purpose + social.purpose * t);
    s.security = unit(s.security + (social.security - poverty) * t);
}

fn update_health(agent: &mut Agent, t: f32, config: &SimConfig) {
    agent.health.progress(t, &config.health);

    let injury = agent.health.worst_injury();
    let pain = &mut agent.needs.pain;
    *pain = if *pain <= injury {
        unit(injury)
    } else {
        unit((*pain - config.physical.pain_relief * t).max(injury))
    };

    agent.needs.health = compute_health(&agent.needs, &agent.health, t, &config.health);
}

fn update_stress(agent: &mut Agent, t: f32, config: &SimConfig) {
    let i = &config.influence;
    let n = &agent.needs;
    let load = i.stress_from_hunger * (1.0 - n.hunger)
        + i.stress_from_thirst * (1.0 - n.thirst)
        + i.stress_from_fatigue * (1.0 - n.fatigue);
    let relief = if n.survival_above(config.health.comfort_threshold) {
        i.stress_recovery
    } else {
        0.0
    };
    let stress = &mut agent.behavior.stress;
    *stress = unit(*stress + (load - relief) * t);
}

fn update_emotions(agent: &mut Agent, t: f32, config: &SimConfig) {
    let i = &config.influence;
    let baseline = agent.personality().baseline();
    let agreeableness = agent.personality().agreeableness;
    agent.emotions.relax_toward(&baseline, unit(i.emotion_relaxation * t));

    let stress = agent.behavior.stress;
    let n = agent.needs;
    let companionship = agent.social.companionship;
    let e = &mut agent.emotions;
    e.happiness = unit(e.happiness - (i.happiness_from_stress * stress + i.happiness_from_pain * n.pain) * t);
    e.fear = unit(e.fear + i.fear_from_health * (1.0 - n.health) * t);
    e.loneliness = unit(e.loneliness + i.loneliness_from_companionship * (1.0 - companionship) * t);
    e.anger = unit(e.anger + i.anger_from_stress * stress * (1.0 - agreeableness) * t);
    e.contentment = unit(e.contentment - i.happiness_from_stress * stress * t);
}

fn derive_drive(agent: &mut Agent) {
    let n = &agent.needs;
    let s = &agent.social;
    let b = &mut agent.behavior;
    b.energy = unit(0.7 * n.fatigue + 0.3 * n.health);
    b.motivation = unit(0.3 * (s.purpose + s.achievement) + 0.4 * agent.emotions.happiness);
}

/// Every directly satisfiable need with its current level, survival first.
pub fn need_levels(agent: &Agent) -> [(NeedKind, f32); 14] {
    let n = &agent.needs;
    let s = &agent.social;
    [
        (NeedKind::Thirst, n.thirst),
        (NeedKind::Hunger, n.hunger),
        (NeedKind::Fatigue, n.fatigue),
        (NeedKind::Temperature, n.temperature),
        (NeedKind::Comfort, n.comfort),
        (NeedKind::Hygiene, n.hygiene),
        (NeedKind::Security, s.security),
        (NeedKind::Companionship, s.companionship),
        (NeedKind::Belonging, s.belonging),
        (NeedKind::Love, s.love),
        (NeedKind::Respect, s.respect),
        (NeedKind::Achievement, s.achievement),
        (NeedKind::Autonomy, s.autonomy),
        (NeedKind::Purpose, s.purpose),
    ]
}

/// The least satisfied need below `threshold`, if any.
pub fn most_urgent_need(agent: &Agent, threshold: f32) -> Option<NeedKind> {
    need_levels(agent)
        .into_iter()
        .filter(|(_, value)| *value < threshold)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(need, _)| need)
}

/// What the agent turns to next, most pressing first: recovering from an
/// untreated condition or poor health, mourning a recent loss, resting,
/// seeking company. Otherwise the leading active goal decides, and an agent
/// without one idles.
pub fn choose_activity(agent: &Agent, now: Turn) -> Activity {
    if agent.health.has_untreated_condition() || InjurySeverity::from_health(agent.needs.health).needs_care() {
        return Activity::Recovering;
    }
    let grieving = agent
        .memory
        .iter()
        .any(|m| m.kind == MemoryKind::Loss && now.saturating_sub(m.timestamp) < MOURNING_TURNS);
    if grieving {
        Activity::Mourning
    } else if agent.needs.fatigue < REST_BELOW {
        Activity::Resting
    } else if agent.social.companionship < LONELY_BELOW {
        Activity::Socializing
    } else {
        match agent.goals.active().first().map(|g| g.kind) {
            Some(GoalKind::Faith) => Activity::Worshipping,
            Some(GoalKind::Explore) => Activity::Traveling,
            Some(_) => Activity::Working,
            None => Activity::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{DeathCause, Personality};
    use crate::health::Injury;
    use crate::goals::Goal;
    use crate::memory::{self, Memory};

    fn agent() -> Agent {
        Agent::new(1, "Ada", "human", 0, Personality::default())
    }

    #[test]
    fn test_one_tick_applies_signed_rates() {
        let config = SimConfig::default();
        let mut a = agent();
        advance_agent(&mut a, 1.0, &Ambient::default(), &config);
        assert!((a.needs.hunger - 0.96).abs() < 1e-6);
        assert!((a.needs.thirst - 0.94).abs() < 1e-6);
        assert!((a.social.companionship - 0.78).abs() < 1e-6);
        assert_eq!(a.needs.health, 1.0);
    }

    #[test]
    fn test_zero_ticks_leaves_needs_alone() {
        let config = SimConfig::default();
        let mut a = agent();
        let before = a.needs;
        advance_agent(&mut a, 0.0, &Ambient::default(), &config);
        assert_eq!(a.needs, before);
    }

    #[test]
    fn test_starvation_raises_stress_and_erodes_health() {
        let config = SimConfig::default();
        let mut a = agent();
        a.needs.hunger = 0.0;
        a.needs.thirst = 0.1;
        let stress = a.behavior.stress;
        advance_agent(&mut a, 1.0, &Ambient::default(), &config);
        assert!(a.behavior.stress > stress);
        assert!(a.needs.health < 1.0);
    }

    #[test]
    fn test_pain_follows_injury_and_fades() {
        let config = SimConfig::default();
        let mut a = agent();
        a.health.injuries.push(Injury::new("gash", 0.6, 0.1));
        advance_agent(&mut a, 1.0, &Ambient::default(), &config);
        assert!((a.needs.pain - 0.5).abs() < 1e-5);
        a.health.injuries.clear();
        advance_agent(&mut a, 1.0, &Ambient::default(), &config);
        assert!((a.needs.pain - 0.45).abs() < 1e-5);
    }

    #[test]
    fn test_harsh_weather_drains_comfort_faster() {
        let config = SimConfig::default();
        let mut calm = agent();
        let mut stormy = agent();
        advance_agent(&mut calm, 1.0, &Ambient::default(), &config);
        let storm = Ambient {
            harshness: 0.8,
            temperature: -10.0,
            ..Ambient::default()
        };
        advance_agent(&mut stormy, 1.0, &storm, &config);
        assert!(stormy.needs.comfort < calm.needs.comfort);
        assert!(stormy.needs.temperature < calm.needs.temperature);
    }

    #[test]
    fn test_deceased_agent_is_frozen() {
        let config = SimConfig::default();
        let mut a = agent();
        a.die(0, DeathCause::OldAge);
        let before = a.needs;
        advance_agent(&mut a, 5.0, &Ambient::default(), &config);
        assert_eq!(a.needs, before);
    }

    #[test]
    fn test_long_run_stays_bounded() {
        let config = SimConfig::default();
        let mut a = agent();
        for _ in 0..500 {
            advance_agent(&mut a, 3.0, &Ambient::default(), &config);
        }
        assert!(a.validate().is_ok());
        assert_eq!(a.needs.hunger, 0.0);
    }

    #[test]
    fn test_most_urgent_need() {
        let mut a = agent();
        assert_eq!(most_urgent_need(&a, 0.3), None);
        a.needs.hunger = 0.2;
        a.needs.thirst = 0.1;
        assert_eq!(most_urgent_need(&a, 0.3), Some(NeedKind::Thirst));
    }

    #[test]
    fn test_activity_follows_most_pressing_state() {
        let config = SimConfig::default();
        let mut a = agent();
        assert_eq!(choose_activity(&a, 1), Activity::Idle);
        a.goals.add(Goal::new(GoalKind::Faith, "serve the faith", 0.8, 0));
        assert_eq!(choose_activity(&a, 1), Activity::Worshipping);

        a.needs.fatigue = 0.1;
        assert_eq!(choose_activity(&a, 1), Activity::Resting);

        memory::record(&mut a, Memory::new(MemoryKind::Loss, 1, "Bram died", 0.8), &config.memory).unwrap();
        assert_eq!(choose_activity(&a, 2), Activity::Mourning);
        assert_eq!(choose_activity(&a, 1 + MOURNING_TURNS), Activity::Resting);

        a.health.injuries.push(Injury::new("gash", 0.4, 0.1));
        assert_eq!(choose_activity(&a, 2), Activity::Recovering);
    }
}
