//! Quest Progress Stores
//!
//! Two layers of shared mutable state: a persistent per-user-per-task store
//! (the authoritative copy for the lifetime of the process, flushed by an
//! external persistence collaborator) and an ephemeral per-match scratch
//! store that batches match-scoped credit before it is committed.
//!
//! Both stores are keyed maps with per-record locking; definitions themselves
//! stay immutable and lock-free. Records are created lazily on first touch,
//! so an unknown key is never an error.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::UserId;

/// Identifies one persistent progress record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub user_id: UserId,
    pub quest_id: i32,
    pub task_id: i32,
}

impl ProgressKey {
    pub fn new(user_id: UserId, quest_id: i32, task_id: i32) -> Self {
        Self { user_id, quest_id, task_id }
    }
}

/// Identifies one ephemeral record. The match id keeps concurrent matches
/// from leaking progress into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub match_id: Uuid,
    pub progress: ProgressKey,
}

impl MatchKey {
    pub fn new(match_id: Uuid, user_id: UserId, quest_id: i32, task_id: i32) -> Self {
        Self {
            match_id,
            progress: ProgressKey::new(user_id, quest_id, task_id),
        }
    }
}

/// Progress on a single task for a single user.
///
/// The same record shape backs both layers: the persistent store uses
/// `units_done`/`finished`/`completed_at`, while streak-based kill conditions
/// drive `streak` through the ephemeral store only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProgress {
    pub units_done: i32,
    /// Latched true once units_done reaches the goal; never reset
    pub finished: bool,
    /// Consecutive qualifying kills toward a streak requirement. Driven only
    /// through the ephemeral layer; persistent records always carry 0.
    pub streak: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of the single authoritative increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Task was already finished for this user; nothing changed
    AlreadyFinished,
    /// Units advanced but the goal was not reached
    Advanced(i32),
    /// This increment reached the goal and latched the finished flag
    Finished,
}

/// Persistent per-user-per-task progress, shared across all match contexts.
#[derive(Default)]
pub struct ProgressStore {
    records: DashMap<ProgressKey, TaskProgress>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for a key; a fresh zero-value record for unknown keys.
    pub fn get(&self, key: ProgressKey) -> TaskProgress {
        self.records
            .get(&key)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn is_finished(&self, key: ProgressKey) -> bool {
        self.records.get(&key).map_or(false, |r| r.finished)
    }

    /// The only mutator of persistent units. No-op once finished, so
    /// duplicate or late-arriving completion events are safe.
    ///
    /// A forced increment asserts the full amount reached (used for
    /// match-scoped commits); units become `max(units, amount)` so a commit
    /// is never double-applied on top of earlier ones. On reaching the goal,
    /// units are clamped to it and the finished flag latches.
    pub fn increment_if_unfinished(
        &self,
        key: ProgressKey,
        amount: i32,
        goal: i32,
        force: bool,
    ) -> IncrementOutcome {
        let mut record = self.records.entry(key).or_default();
        if record.finished {
            return IncrementOutcome::AlreadyFinished;
        }

        if force {
            record.units_done = record.units_done.max(amount);
        } else {
            record.units_done += amount;
        }

        if record.units_done >= goal {
            record.units_done = goal;
            record.finished = true;
            record.completed_at = Some(Utc::now());
            IncrementOutcome::Finished
        } else {
            IncrementOutcome::Advanced(record.units_done)
        }
    }

    /// Every live record, for the persistence collaborator to flush.
    pub fn snapshot(&self) -> Vec<(ProgressKey, TaskProgress)> {
        self.records
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect()
    }

    /// Bulk-load records, e.g. at process startup. Replaces existing entries
    /// for the same keys.
    pub fn restore(&self, records: impl IntoIterator<Item = (ProgressKey, TaskProgress)>) {
        for (key, record) in records {
            self.records.insert(key, record);
        }
    }

    /// Serialize all records to JSON for the persistence collaborator
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Load records from a JSON snapshot
    pub fn restore_json(&self, json: &str) -> Result<(), String> {
        let records: Vec<(ProgressKey, TaskProgress)> =
            serde_json::from_str(json).map_err(|e| format!("Invalid progress snapshot: {}", e))?;
        self.restore(records);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ephemeral per-match scratch progress. Created on first access during a
/// match, discarded when the match ends; never persisted.
#[derive(Default)]
pub struct MatchProgressStore {
    records: DashMap<MatchKey, TaskProgress>,
}

impl MatchProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create a record and mutate it under its entry lock. Callers
    /// must not touch another record of this store inside `f`.
    pub(crate) fn with_record<R>(&self, key: MatchKey, f: impl FnOnce(&mut TaskProgress) -> R) -> R {
        let mut record = self.records.entry(key).or_default();
        f(&mut record)
    }

    /// Current record; a fresh zero-value record for unknown keys.
    pub fn get(&self, key: MatchKey) -> TaskProgress {
        self.records
            .get(&key)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Cleanup pass for a finished match: drops every record it produced.
    pub fn clear_match(&self, match_id: Uuid) {
        self.records.retain(|k, _| k.match_id != match_id);
    }

    /// Drops one player's records for a match (player left early).
    pub fn clear_player(&self, match_id: Uuid, user_id: UserId) {
        self.records
            .retain(|k, _| !(k.match_id == match_id && k.progress.user_id == user_id));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ProgressKey {
        ProgressKey::new(1, 10, 100)
    }

    #[test]
    fn test_lazy_zero_record() {
        let store = ProgressStore::new();
        let record = store.get(key());
        assert_eq!(record.units_done, 0);
        assert!(!record.finished);
        assert!(!store.is_finished(key()));
    }

    #[test]
    fn test_increment_latches_once() {
        let store = ProgressStore::new();

        assert_eq!(
            store.increment_if_unfinished(key(), 2, 3, false),
            IncrementOutcome::Advanced(2)
        );
        assert_eq!(
            store.increment_if_unfinished(key(), 2, 3, false),
            IncrementOutcome::Finished
        );

        let record = store.get(key());
        assert!(record.finished);
        assert_eq!(record.units_done, 3); // clamped to goal
        assert!(record.completed_at.is_some());

        // Replaying the completing event is a benign no-op
        assert_eq!(
            store.increment_if_unfinished(key(), 2, 3, false),
            IncrementOutcome::AlreadyFinished
        );
        assert_eq!(store.get(key()).units_done, 3);
    }

    #[test]
    fn test_forced_increment_never_double_applies() {
        let store = ProgressStore::new();

        assert_eq!(
            store.increment_if_unfinished(key(), 4, 10, true),
            IncrementOutcome::Advanced(4)
        );
        // A second forced assertion of a smaller total changes nothing
        assert_eq!(
            store.increment_if_unfinished(key(), 3, 10, true),
            IncrementOutcome::Advanced(4)
        );
        assert_eq!(
            store.increment_if_unfinished(key(), 10, 10, true),
            IncrementOutcome::Finished
        );
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let store = ProgressStore::new();
        store.increment_if_unfinished(key(), 2, 5, false);

        let json = store.snapshot_json();
        let restored = ProgressStore::new();
        restored.restore_json(&json).unwrap();
        assert_eq!(restored.get(key()).units_done, 2);

        assert!(restored.restore_json("not json").is_err());
    }

    #[test]
    fn test_match_store_scoping() {
        let store = MatchProgressStore::new();
        let match_a = Uuid::new_v4();
        let match_b = Uuid::new_v4();
        let in_a = MatchKey::new(match_a, 1, 10, 100);
        let in_b = MatchKey::new(match_b, 1, 10, 100);

        store.with_record(in_a, |r| r.units_done += 3);
        store.with_record(in_b, |r| r.units_done += 7);

        assert_eq!(store.get(in_a).units_done, 3);
        assert_eq!(store.get(in_b).units_done, 7);

        store.clear_match(match_a);
        assert_eq!(store.get(in_a).units_done, 0);
        assert_eq!(store.get(in_b).units_done, 7);
    }

    #[test]
    fn test_match_store_clear_player() {
        let store = MatchProgressStore::new();
        let match_id = Uuid::new_v4();
        let player_one = MatchKey::new(match_id, 1, 10, 100);
        let player_two = MatchKey::new(match_id, 2, 10, 100);

        store.with_record(player_one, |r| r.units_done = 5);
        store.with_record(player_two, |r| r.units_done = 5);

        store.clear_player(match_id, 1);
        assert_eq!(store.get(player_one).units_done, 0);
        assert_eq!(store.get(player_two).units_done, 5);
    }
}
