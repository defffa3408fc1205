//! Goal engine — urgency growth, scoring, and the bounded active set.
//!
//! Each turn [`update`] grows every goal's urgency with the turns since it
//! last progressed (jumping as a deadline closes in), scores it against the
//! agent's current [`Drives`], then stable-sorts active and dormant goals
//! together. The first `max_active` stay active; the rest become dormant and
//! may be promoted back on a later turn.
//!
//! Progress only moves through explicit resolution ([`resolve_progress`]) and
//! never backwards. A goal reaching 1.0 completes and leaves an achievement
//! memory; abandonment retires it without completing.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, Turn};
use crate::common::{in_range, unit};
use crate::config::check;
use crate::error::RuleError;
use crate::memory::{Memory, MemoryConfig, MemoryKind};

pub type GoalId = u64;

/// Retired goals kept for history.
const COMPLETED_HISTORY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    Survive,
    Wealth,
    Knowledge,
    Relationship,
    Family,
    Power,
    Faith,
    Craft,
    Explore,
    Revenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Active,
    Dormant,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub kind: GoalKind,
    pub description: String,
    pub priority: f32,
    pub urgency: f32,
    pub progress: f32,
    pub target_agent: Option<AgentId>,
    pub target_location: Option<String>,
    pub deadline: Option<Turn>,
    pub created_at: Turn,
    pub last_progress: Turn,
    /// Score from the most recent update.
    pub score: f32,
    pub status: GoalStatus,
}

impl Goal {
    pub fn new(kind: GoalKind, description: impl Into<String>, priority: f32, created_at: Turn) -> Self {
        Self {
            id: 0,
            kind,
            description: description.into(),
            priority: unit(priority),
            urgency: 0.0,
            progress: 0.0,
            target_agent: None,
            target_location: None,
            deadline: None,
            created_at,
            last_progress: created_at,
            score: 0.0,
            status: GoalStatus::Active,
        }
    }

    pub fn with_target_agent(mut self, agent: AgentId) -> Self {
        self.target_agent = Some(agent);
        self
    }

    pub fn with_deadline(mut self, deadline: Turn) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Current pressures an agent feels, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drives {
    pub survival: f32,
    pub social: f32,
    pub esteem: f32,
    pub security: f32,
    pub meaning: f32,
    pub curiosity: f32,
    pub ambition: f32,
    pub grievance: f32,
}

impl Drives {
    pub fn from_agent(agent: &Agent) -> Self {
        let n = &agent.needs;
        let s = &agent.social;
        let p = agent.personality();
        Self {
            survival: unit(n.worst_survival_deficit().max(1.0 - n.health)),
            social: unit(1.0 - s.companionship.min(s.love).min(s.belonging)),
            esteem: unit(1.0 - s.respect.min(s.achievement)),
            security: unit(1.0 - s.security),
            meaning: unit((1.0 - s.purpose) * 0.5 + p.spirituality * 0.5),
            curiosity: unit((p.curiosity + p.openness) / 2.0),
            ambition: p.ambition,
            grievance: agent.emotions.anger,
        }
    }

    /// How strongly the current drives favour a goal of `kind`.
    pub fn alignment(&self, kind: GoalKind) -> f32 {
        match kind {
            GoalKind::Survive => self.survival,
            GoalKind::Wealth => self.security.max(self.ambition * 0.5),
            GoalKind::Knowledge | GoalKind::Explore => self.curiosity,
            GoalKind::Relationship | GoalKind::Family => self.social,
            GoalKind::Power => self.ambition,
            GoalKind::Faith => self.meaning,
            GoalKind::Craft => self.esteem,
            GoalKind::Revenge => self.grievance,
        }
    }
}

/// Fixed weight table and urgency tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    pub priority_weight: f32,
    pub urgency_weight: f32,
    pub alignment_weight: f32,
    /// Urgency per turn since last progress.
    pub urgency_growth: f32,
    /// Turns before a deadline at which urgency jumps.
    pub deadline_window: Turn,
    /// Urgency floor on entering the deadline window.
    pub deadline_urgency: f32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            priority_weight: 0.4,
            urgency_weight: 0.35,
            alignment_weight: 0.25,
            urgency_growth: 0.01,
            deadline_window: 5,
            deadline_urgency: 0.8,
        }
    }
}

impl GoalConfig {
    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        check("goals.priority_weight", self.priority_weight, 0.0, 1.0)?;
        check("goals.urgency_weight", self.urgency_weight, 0.0, 1.0)?;
        check("goals.alignment_weight", self.alignment_weight, 0.0, 1.0)?;
        check("goals.urgency_growth", self.urgency_growth, 0.0, 1.0)?;
        check("goals.deadline_urgency", self.deadline_urgency, 0.0, 1.0)
    }

    fn score(&self, goal: &Goal, drives: &Drives) -> f32 {
        self.priority_weight * goal.priority
            + self.urgency_weight * goal.urgency
            + self.alignment_weight * drives.alignment(goal.kind)
    }
}

/// Active goals (best first), dormant overflow, and retired history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSet {
    active: Vec<Goal>,
    dormant: Vec<Goal>,
    completed: Vec<Goal>,
    pub max_active: usize,
    next_id: GoalId,
}

impl Default for GoalSet {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            dormant: Vec::new(),
            completed: Vec::new(),
            max_active: 5,
            next_id: 1,
        }
    }
}

impl GoalSet {
    pub fn active(&self) -> &[Goal] {
        &self.active
    }

    pub fn dormant(&self) -> &[Goal] {
        &self.dormant
    }

    pub fn completed(&self) -> &[Goal] {
        &self.completed
    }

    pub fn get(&self, id: GoalId) -> Option<&Goal> {
        self.active.iter().chain(&self.dormant).find(|g| g.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.dormant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a goal as active, demoting the weakest if the cap is exceeded.
    pub fn add(&mut self, mut goal: Goal) -> GoalId {
        let id = self.next_id;
        self.next_id += 1;
        goal.id = id;
        goal.status = GoalStatus::Active;
        self.active.push(goal);
        self.rebalance();
        id
    }

    /// Grow urgency, re-score, re-sort, and re-apply the active cap.
    pub fn update(&mut self, drives: &Drives, now: Turn, config: &GoalConfig) {
        for goal in self.active.iter_mut().chain(self.dormant.iter_mut()) {
            let since = now.saturating_sub(goal.last_progress) as f32;
            goal.urgency = unit(goal.urgency.max(config.urgency_growth * since));
            if let Some(deadline) = goal.deadline {
                let remaining = deadline.saturating_sub(now);
                if remaining <= config.deadline_window {
                    let closeness = if config.deadline_window == 0 {
                        1.0
                    } else {
                        1.0 - remaining as f32 / config.deadline_window as f32
                    };
                    let floor = config.deadline_urgency + (1.0 - config.deadline_urgency) * closeness;
                    goal.urgency = unit(goal.urgency.max(floor));
                }
            }
            goal.score = config.score(goal, drives);
        }
        self.rebalance();
    }

    /// Stable sort by score descending, ties by creation then id, and split at the cap.
    fn rebalance(&mut self) {
        let mut all: Vec<Goal> = self.active.drain(..).chain(self.dormant.drain(..)).collect();
        all.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        let split = all.len().min(self.max_active);
        self.dormant = all.split_off(split);
        self.active = all;
        for goal in &mut self.active {
            goal.status = GoalStatus::Active;
        }
        for goal in &mut self.dormant {
            goal.status = GoalStatus::Dormant;
        }
    }

    fn take(&mut self, id: GoalId) -> Option<Goal> {
        if let Some(idx) = self.active.iter().position(|g| g.id == id) {
            return Some(self.active.remove(idx));
        }
        let idx = self.dormant.iter().position(|g| g.id == id)?;
        Some(self.dormant.remove(idx))
    }

    fn retire(&mut self, goal: Goal) {
        self.completed.push(goal);
        if self.completed.len() > COMPLETED_HISTORY {
            self.completed.remove(0);
        }
    }

    /// Raise a goal's progress. Lowering it is rejected; reaching 1.0
    /// completes the goal and returns it.
    pub fn set_progress(&mut self, id: GoalId, progress: f32, now: Turn) -> Result<Option<Goal>, RuleError> {
        check("goal.progress", progress, 0.0, 1.0)?;
        let goal = self
            .active
            .iter_mut()
            .chain(self.dormant.iter_mut())
            .find(|g| g.id == id)
            .ok_or(RuleError::UnknownGoal(id))?;
        if progress < goal.progress {
            return Err(RuleError::ProgressRegression {
                goal: id,
                current: goal.progress,
                requested: progress,
            });
        }
        if progress > goal.progress {
            goal.progress = progress;
            goal.last_progress = goal.last_progress.max(now);
            goal.urgency *= 0.5;
        }
        if goal.progress < 1.0 {
            return Ok(None);
        }
        let mut done = self.take(id).ok_or(RuleError::UnknownGoal(id))?;
        done.status = GoalStatus::Completed;
        self.retire(done.clone());
        self.rebalance();
        Ok(Some(done))
    }

    /// Retire a goal without completing it.
    pub fn abandon(&mut self, id: GoalId) -> Result<Goal, RuleError> {
        let mut goal = self.take(id).ok_or(RuleError::UnknownGoal(id))?;
        goal.status = GoalStatus::Abandoned;
        self.retire(goal.clone());
        self.rebalance();
        Ok(goal)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.active.len() > self.max_active {
            return Err(format!("{} active goals exceed cap {}", self.active.len(), self.max_active));
        }
        for goal in self.active.iter().chain(&self.dormant).chain(&self.completed) {
            for (field, value) in [
                ("priority", goal.priority),
                ("urgency", goal.urgency),
                ("progress", goal.progress),
            ] {
                if !in_range(value, 0.0, 1.0) {
                    return Err(format!("goal {} {field} = {value} left [0, 1]", goal.id));
                }
            }
        }
        Ok(())
    }
}

/// Re-score an agent's goals against its current drives.
pub fn update(agent: &mut Agent, now: Turn, config: &GoalConfig) {
    let drives = Drives::from_agent(agent);
    agent.goals.update(&drives, now, config);
}

/// Apply explicit progress to one of an agent's goals, recording an
/// achievement memory when it completes.
pub fn resolve_progress(
    agent: &mut Agent,
    id: GoalId,
    progress: f32,
    now: Turn,
    memory: &MemoryConfig,
) -> Result<Option<Goal>, RuleError> {
    let completed = agent.goals.set_progress(id, progress, now)?;
    if let Some(goal) = &completed {
        let mut participants = Vec::new();
        participants.extend(goal.target_agent);
        let record = Memory::new(
            MemoryKind::Achievement,
            now,
            format!("achieved: {}", goal.description),
            0.5 + 0.5 * goal.priority,
        )
        .with_participants(participants)
        .with_impact(0.6);
        crate::memory::record(agent, record, memory)?;
        agent.social.achievement = unit(agent.social.achievement + 0.2);
        agent.social.purpose = unit(agent.social.purpose + 0.1);
    }
    Ok(completed)
}
