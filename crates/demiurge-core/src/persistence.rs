//! Persistence collaborator seam and an in-process store.
//!
//! World snapshots are encoded with bincode behind a format version. Event
//! and decision records are keyed by (world, turn); writing the same key
//! twice replaces the earlier record.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use demiurge_logic::agent::Turn;
use serde::{Deserialize, Serialize};

use crate::delta::WorldDelta;
use crate::error::StoreError;
use crate::intervention::Intervention;
use crate::narrative::NarrativeResponse;
use crate::world::{CurrentState, WorldId, WorldState};

/// Version number for the snapshot format (increment when it changes).
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    world: &'a WorldState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    world: WorldState,
}

/// Write a versioned snapshot of `world`.
pub fn save_world<W: Write>(writer: W, world: &WorldState) -> Result<(), StoreError> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        world,
    };
    bincode::serialize_into(writer, &snapshot)?;
    Ok(())
}

/// Read a snapshot written by [`save_world`].
pub fn load_world<R: Read>(reader: R) -> Result<WorldState, StoreError> {
    let snapshot: Snapshot = bincode::deserialize_from(reader)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StoreError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }
    Ok(snapshot.world)
}

/// Narrative outcome stored with a turn's event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NarrativeStatus {
    /// Generation failed or has not run; retryable.
    Pending { reason: String },
    Ready(NarrativeResponse),
    /// Plain narrative text carried over from an older record.
    Legacy(String),
}

/// What happened in one committed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub turn: Turn,
    pub delta: WorldDelta,
    pub narrative: NarrativeStatus,
}

/// Durable storage as the engine sees it.
pub trait WorldStore: Send + Sync {
    fn load_world(&self, id: WorldId) -> Result<WorldState, StoreError>;

    /// Store `world`. Fails with `Conflict` when a stored copy exists whose
    /// turn is not older than `world.turn`.
    fn commit_world(&self, world: &WorldState) -> Result<(), StoreError>;

    /// Summary persisted beside the latest snapshot.
    fn current_state(&self, id: WorldId) -> Result<CurrentState, StoreError>;

    fn append_event(&self, world: WorldId, turn: Turn, record: EventRecord) -> Result<(), StoreError>;

    fn event(&self, world: WorldId, turn: Turn) -> Result<Option<EventRecord>, StoreError>;

    fn record_decision(&self, world: WorldId, turn: Turn, decision: &Intervention) -> Result<(), StoreError>;

    fn decision(&self, world: WorldId, turn: Turn) -> Result<Option<Intervention>, StoreError>;
}

struct StoredWorld {
    turn: Turn,
    summary: CurrentState,
    snapshot: Vec<u8>,
}

/// Store that keeps everything in process memory.
pub struct InMemoryStore {
    worlds: Mutex<HashMap<WorldId, StoredWorld>>,
    events: Mutex<BTreeMap<(WorldId, Turn), EventRecord>>,
    decisions: Mutex<BTreeMap<(WorldId, Turn), Intervention>>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            worlds: Mutex::new(HashMap::new()),
            events: Mutex::new(BTreeMap::new()),
            decisions: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store offline".into()))
        }
    }

    /// Size in bytes of the stored snapshot, if any.
    pub fn snapshot_len(&self, id: WorldId) -> Result<Option<usize>, StoreError> {
        Ok(guard(&self.worlds)?.get(&id).map(|w| w.snapshot.len()))
    }
}

impl WorldStore for InMemoryStore {
    fn load_world(&self, id: WorldId) -> Result<WorldState, StoreError> {
        self.check()?;
        let worlds = guard(&self.worlds)?;
        let stored = worlds.get(&id).ok_or(StoreError::NotFound(id))?;
        load_world(stored.snapshot.as_slice())
    }

    fn commit_world(&self, world: &WorldState) -> Result<(), StoreError> {
        self.check()?;
        let mut snapshot = Vec::new();
        save_world(&mut snapshot, world)?;
        let mut worlds = guard(&self.worlds)?;
        if let Some(stored) = worlds.get(&world.id) {
            if world.turn <= stored.turn {
                return Err(StoreError::Conflict {
                    stored: stored.turn,
                    attempted: world.turn,
                });
            }
        }
        worlds.insert(
            world.id,
            StoredWorld {
                turn: world.turn,
                summary: world.current_state(),
                snapshot,
            },
        );
        Ok(())
    }

    fn current_state(&self, id: WorldId) -> Result<CurrentState, StoreError> {
        self.check()?;
        let worlds = guard(&self.worlds)?;
        worlds
            .get(&id)
            .map(|w| w.summary.clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn append_event(&self, world: WorldId, turn: Turn, record: EventRecord) -> Result<(), StoreError> {
        self.check()?;
        guard(&self.events)?.insert((world, turn), record);
        Ok(())
    }

    fn event(&self, world: WorldId, turn: Turn) -> Result<Option<EventRecord>, StoreError> {
        self.check()?;
        Ok(guard(&self.events)?.get(&(world, turn)).cloned())
    }

    fn record_decision(&self, world: WorldId, turn: Turn, decision: &Intervention) -> Result<(), StoreError> {
        self.check()?;
        guard(&self.decisions)?.insert((world, turn), decision.clone());
        Ok(())
    }

    fn decision(&self, world: WorldId, turn: Turn) -> Result<Option<Intervention>, StoreError> {
        self.check()?;
        Ok(guard(&self.decisions)?.get(&(world, turn)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::SetupConfig;

    fn world(turn: Turn) -> WorldState {
        let mut w = WorldState::new(9, "Test", 1, SetupConfig::default());
        w.turn = turn;
        w
    }

    #[test]
    fn test_version_mismatch_rejected() {
        #[derive(Serialize)]
        struct Future<'a> {
            version: u32,
            world: &'a WorldState,
        }
        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &Future { version: 99, world: &world(0) }).unwrap();
        assert!(matches!(
            load_world(buf.as_slice()),
            Err(StoreError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_commit_must_advance_turn() {
        let store = InMemoryStore::new();
        store.commit_world(&world(0)).unwrap();
        store.commit_world(&world(1)).unwrap();
        assert!(matches!(
            store.commit_world(&world(1)),
            Err(StoreError::Conflict { stored: 1, attempted: 1 })
        ));
        assert_eq!(store.load_world(9).unwrap().turn, 1);
        assert_eq!(store.current_state(9).unwrap().turn, 1);
    }

    #[test]
    fn test_missing_world() {
        let store = InMemoryStore::new();
        assert!(matches!(store.load_world(4), Err(StoreError::NotFound(4))));
        assert_eq!(store.snapshot_len(4).unwrap(), None);
        store.commit_world(&world(0)).unwrap();
        assert!(store.snapshot_len(9).unwrap().is_some_and(|n| n > 0));
    }

    #[test]
    fn test_event_upsert_by_turn() {
        let store = InMemoryStore::new();
        let record = |reason: &str| EventRecord {
            turn: 2,
            delta: WorldDelta::default(),
            narrative: NarrativeStatus::Pending { reason: reason.into() },
        };
        store.append_event(9, 2, record("first")).unwrap();
        store.append_event(9, 2, record("second")).unwrap();
        assert_eq!(store.event(9, 2).unwrap(), Some(record("second")));
        assert_eq!(store.event(9, 3).unwrap(), None);
    }

    #[test]
    fn test_offline_store() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(matches!(store.commit_world(&world(0)), Err(StoreError::Unavailable(_))));
        store.set_available(true);
        store.commit_world(&world(0)).unwrap();
    }
}
