//! Memory subsystem — importance-weighted recording, forgetting, and the
//! working / long-term split.
//!
//! # Model
//!
//! Every memory carries an `importance` that decays linearly by its own
//! `decay_rate` each tick. Memories whose importance reaches zero are
//! forgotten. After each decay pass two index sets are re-derived:
//!
//! - **working** — the `attention_span` most important memories formed
//!   within the recency window (ties go to the more recent memory);
//! - **long-term** — every memory at or above the long-term floor,
//!   regardless of age.
//!
//! When the store is full, the default [`CapacityPolicy::Evict`] drops the
//! least important memory (the older one on ties). [`CapacityPolicy::HardCap`]
//! refuses the new record instead.
//!
//! ```
//! use demiurge_logic::memory::{Memory, MemoryConfig, MemoryKind, MemoryStore};
//!
//! let config = MemoryConfig::default();
//! let mut store = MemoryStore::default();
//! store
//!     .record(Memory::new(MemoryKind::Witnessed, 1, "the river flooded", 0.9), 8, &config)
//!     .unwrap();
//! store.decay_all(1.0, 2, 7, &config);
//! assert_eq!(store.working().len(), 1);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, Turn};
use crate::common::{in_range, signed_unit};
use crate::config::check;
use crate::error::RuleError;

pub type MemoryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryKind {
    Interaction,
    Witnessed,
    Loss,
    Achievement,
    Failure,
    Intervention,
    Birth,
    Injury,
}

/// One remembered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Assigned by the store on record.
    pub id: MemoryId,
    pub timestamp: Turn,
    pub kind: MemoryKind,
    /// Reference to the event's content (text or an external key).
    pub content: String,
    pub participants: Vec<AgentId>,
    /// -1.0 (traumatic) to 1.0 (joyful).
    pub emotional_impact: f32,
    pub importance: f32,
    /// Importance lost per tick.
    pub decay_rate: f32,
}

impl Memory {
    pub fn new(kind: MemoryKind, timestamp: Turn, content: impl Into<String>, importance: f32) -> Self {
        Self {
            id: 0,
            timestamp,
            kind,
            content: content.into(),
            participants: Vec::new(),
            emotional_impact: 0.0,
            importance,
            decay_rate: 0.01,
        }
    }

    pub fn with_participants(mut self, participants: Vec<AgentId>) -> Self {
        self.participants = participants;
        self
    }

    pub fn with_impact(mut self, impact: f32) -> Self {
        self.emotional_impact = signed_unit(impact);
        self
    }

    pub fn with_decay_rate(mut self, rate: f32) -> Self {
        self.decay_rate = rate;
        self
    }
}

/// What to do when a record would exceed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapacityPolicy {
    #[default]
    Evict,
    HardCap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub policy: CapacityPolicy,
    /// Turns a memory stays eligible for the working set.
    pub recency_window: Turn,
    /// Minimum importance for the long-term set.
    pub long_term_floor: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            policy: CapacityPolicy::Evict,
            recency_window: 12,
            long_term_floor: 0.5,
        }
    }
}

impl MemoryConfig {
    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        check("memory.long_term_floor", self.long_term_floor, 0.0, f32::MAX)
    }
}

/// An agent's memories plus the derived working and long-term index sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    memories: Vec<Memory>,
    working: Vec<MemoryId>,
    long_term: Vec<MemoryId>,
    next_id: MemoryId,
}

/// Higher importance first, then more recent, then later id.
fn salience(a: &Memory, b: &Memory) -> Ordering {
    b.importance
        .partial_cmp(&a.importance)
        .unwrap_or(Ordering::Equal)
        .then(b.timestamp.cmp(&a.timestamp))
        .then(b.id.cmp(&a.id))
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Memory> {
        self.memories.iter()
    }

    pub fn get(&self, id: MemoryId) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// Working-memory records, most salient first.
    pub fn working(&self) -> Vec<&Memory> {
        self.working.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Long-term records, most salient first.
    pub fn long_term(&self) -> Vec<&Memory> {
        self.long_term.iter().filter_map(|id| self.get(*id)).collect()
    }

    pub fn working_ids(&self) -> &[MemoryId] {
        &self.working
    }

    pub fn long_term_ids(&self) -> &[MemoryId] {
        &self.long_term
    }

    /// Memories in which `agent` took part.
    pub fn involving(&self, agent: AgentId) -> impl Iterator<Item = &Memory> {
        self.memories
            .iter()
            .filter(move |m| m.participants.contains(&agent))
    }

    /// The memory with the largest absolute emotional impact.
    pub fn strongest(&self) -> Option<&Memory> {
        self.memories.iter().max_by(|a, b| {
            a.emotional_impact
                .abs()
                .partial_cmp(&b.emotional_impact.abs())
                .unwrap_or(Ordering::Equal)
        })
    }

    /// Append a memory, assigning its id.
    ///
    /// Importance and decay rate must be finite and non-negative. When the
    /// store would exceed `capacity`, the eviction policy decides: `Evict`
    /// drops the least important record, `HardCap` rejects with
    /// [`RuleError::CapacityExceeded`]. Returns `None` when the new memory
    /// was itself the one evicted.
    pub fn record(
        &mut self,
        mut memory: Memory,
        capacity: usize,
        config: &MemoryConfig,
    ) -> Result<Option<MemoryId>, RuleError> {
        check("memory.importance", memory.importance, 0.0, f32::MAX)?;
        check("memory.decay_rate", memory.decay_rate, 0.0, f32::MAX)?;
        if config.policy == CapacityPolicy::HardCap && self.memories.len() >= capacity {
            return Err(RuleError::CapacityExceeded { capacity });
        }

        let id = self.next_id;
        self.next_id += 1;
        memory.id = id;
        self.memories.push(memory);

        let mut kept = true;
        while self.memories.len() > capacity {
            if self.evict_one() == Some(id) {
                kept = false;
            }
        }
        Ok(kept.then_some(id))
    }

    /// Drop the least salient memory, returning its id.
    fn evict_one(&mut self) -> Option<MemoryId> {
        let victim = self
            .memories
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| salience(a, b))
            .map(|(idx, _)| idx);
        if let Some(idx) = victim {
            let removed = self.memories.remove(idx);
            self.working.retain(|id| *id != removed.id);
            self.long_term.retain(|id| *id != removed.id);
            return Some(removed.id);
        }
        None
    }

    /// Age every memory by `elapsed` ticks, forget those at or below zero
    /// importance, and re-derive the working and long-term sets.
    pub fn decay_all(&mut self, elapsed: f32, now: Turn, attention_span: usize, config: &MemoryConfig) {
        let elapsed = elapsed.max(0.0);
        for memory in &mut self.memories {
            memory.importance = (memory.importance - memory.decay_rate * elapsed).max(0.0);
        }
        self.memories.retain(|m| m.importance > 0.0);
        self.rederive(now, attention_span, config);
    }

    fn rederive(&mut self, now: Turn, attention_span: usize, config: &MemoryConfig) {
        let mut recent: Vec<&Memory> = self
            .memories
            .iter()
            .filter(|m| now.saturating_sub(m.timestamp) <= config.recency_window)
            .collect();
        recent.sort_by(|a, b| salience(a, b));
        self.working = recent.iter().take(attention_span).map(|m| m.id).collect();

        let mut lasting: Vec<&Memory> = self
            .memories
            .iter()
            .filter(|m| m.importance >= config.long_term_floor)
            .collect();
        lasting.sort_by(|a, b| salience(a, b));
        self.long_term = lasting.iter().map(|m| m.id).collect();
    }

    pub(crate) fn validate(&self, capacity: usize) -> Result<(), String> {
        if self.memories.len() > capacity {
            return Err(format!("{} memories exceed capacity {capacity}", self.memories.len()));
        }
        for memory in &self.memories {
            if !memory.importance.is_finite() || memory.importance < 0.0 {
                return Err(format!("memory {} importance = {}", memory.id, memory.importance));
            }
            if !in_range(memory.emotional_impact, -1.0, 1.0) {
                return Err(format!("memory {} impact = {}", memory.id, memory.emotional_impact));
            }
        }
        for id in self.working.iter().chain(&self.long_term) {
            if self.get(*id).is_none() {
                return Err(format!("index refers to forgotten memory {id}"));
            }
        }
        Ok(())
    }
}

/// Record a memory against the agent's own capacity.
pub fn record(agent: &mut Agent, memory: Memory, config: &MemoryConfig) -> Result<Option<MemoryId>, RuleError> {
    let capacity = agent.cognition.memory_capacity;
    agent.memory.record(memory, capacity, config)
}

/// Decay an agent's memories using its own attention span.
pub fn decay_all(agent: &mut Agent, elapsed: f32, now: Turn, config: &MemoryConfig) {
    let span = agent.cognition.attention_span;
    agent.memory.decay_all(elapsed, now, span, config);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(timestamp: Turn, importance: f32) -> Memory {
        Memory::new(MemoryKind::Witnessed, timestamp, "event", importance)
    }

    fn kept(store: &mut MemoryStore, memory: Memory, capacity: usize, config: &MemoryConfig) -> MemoryId {
        store.record(memory, capacity, config).unwrap().expect("memory retained")
    }

    #[test]
    fn test_record_assigns_sequential_ids() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        let a = store.record(mem(0, 0.5), 4, &config).unwrap();
        let b = store.record(mem(0, 0.5), 4, &config).unwrap();
        assert_eq!((a, b), (Some(0), Some(1)));
    }

    #[test]
    fn test_evicts_least_important_when_full() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        store.record(mem(0, 0.9), 2, &config).unwrap();
        let weak = kept(&mut store, mem(1, 0.1), 2, &config);
        store.record(mem(2, 0.5), 2, &config).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(weak).is_none());
    }

    #[test]
    fn test_weakest_new_memory_reports_evicted() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        store.record(mem(0, 0.9), 2, &config).unwrap();
        store.record(mem(1, 0.8), 2, &config).unwrap();
        assert_eq!(store.record(mem(2, 0.1), 2, &config).unwrap(), None);
        assert_eq!(store.len(), 2);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_eviction_tie_drops_older() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        let old = kept(&mut store, mem(1, 0.4), 2, &config);
        let newer = kept(&mut store, mem(5, 0.4), 2, &config);
        store.record(mem(6, 0.8), 2, &config).unwrap();
        assert!(store.get(old).is_none());
        assert!(store.get(newer).is_some());
    }

    #[test]
    fn test_hard_cap_rejects() {
        let config = MemoryConfig {
            policy: CapacityPolicy::HardCap,
            ..MemoryConfig::default()
        };
        let mut store = MemoryStore::default();
        store.record(mem(0, 0.5), 1, &config).unwrap();
        assert_eq!(
            store.record(mem(1, 0.5), 1, &config),
            Err(RuleError::CapacityExceeded { capacity: 1 })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_negative_importance_rejected() {
        let mut store = MemoryStore::default();
        let result = store.record(mem(0, -0.1), 4, &MemoryConfig::default());
        assert!(matches!(result, Err(RuleError::OutOfRange { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_decay_forgets_at_zero() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        store.record(mem(0, 0.04).with_decay_rate(0.01), 8, &config).unwrap();
        store.record(mem(0, 0.5).with_decay_rate(0.01), 8, &config).unwrap();
        store.decay_all(5.0, 5, 4, &config);
        assert_eq!(store.len(), 1);
        assert!((store.iter().next().unwrap().importance - 0.45).abs() < 1e-5);
    }

    #[test]
    fn test_working_set_prefers_recent_on_tie() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        let older = kept(&mut store, mem(3, 0.6).with_decay_rate(0.0), 8, &config);
        let newer = kept(&mut store, mem(4, 0.6).with_decay_rate(0.0), 8, &config);
        store.decay_all(0.0, 5, 1, &config);
        assert_eq!(store.working_ids(), &[newer]);
        assert!(store.long_term_ids().contains(&older));
    }

    #[test]
    fn test_working_set_respects_recency_window() {
        let config = MemoryConfig {
            recency_window: 2,
            ..MemoryConfig::default()
        };
        let mut store = MemoryStore::default();
        let ancient = kept(&mut store, mem(0, 0.9).with_decay_rate(0.0), 8, &config);
        let fresh = kept(&mut store, mem(9, 0.2).with_decay_rate(0.0), 8, &config);
        store.decay_all(0.0, 10, 5, &config);
        assert_eq!(store.working_ids(), &[fresh]);
        assert_eq!(store.long_term_ids(), &[ancient]);
    }

    #[test]
    fn test_zero_elapsed_decay_is_idempotent() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        for t in 0..6 {
            store.record(mem(t, 0.1 * t as f32), 4, &config).unwrap();
        }
        store.decay_all(0.0, 6, 3, &config);
        let first: Vec<Memory> = store.iter().cloned().collect();
        let first_working = store.working_ids().to_vec();
        store.decay_all(0.0, 6, 3, &config);
        let second: Vec<Memory> = store.iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(first_working, store.working_ids());
    }

    #[test]
    fn test_recall_helpers() {
        let config = MemoryConfig::default();
        let mut store = MemoryStore::default();
        store
            .record(mem(0, 0.5).with_participants(vec![7]).with_impact(-0.8), 8, &config)
            .unwrap();
        store
            .record(mem(1, 0.5).with_participants(vec![8]).with_impact(0.3), 8, &config)
            .unwrap();
        assert_eq!(store.involving(7).count(), 1);
        assert_eq!(store.strongest().unwrap().participants, vec![7]);
    }
}
