//! Append-only, per-entity assessment history.
//!
//! Every persistence medium implements [`HistoryStore`]; business logic never
//! branches on the backend. `None` as entity id addresses the default
//! (unscoped) entity, which is a partition of its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::assessment::{Assessment, NewAssessment};
use crate::error::StoreError;

/// One known entity and its current Lag State.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EntitySummary {
    pub entity_id: Option<String>,
    pub assessments: i64,
    pub lag_score: f64,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one Assessment to its entity's history and return it with the
    /// store-assigned sequence id. The only mutation the store offers.
    async fn append(&self, entry: NewAssessment) -> Result<Assessment, StoreError>;

    async fn latest(&self, entity_id: Option<&str>) -> Result<Option<Assessment>, StoreError>;

    /// Up to `n` most recent Assessments, oldest first.
    async fn recent(
        &self,
        entity_id: Option<&str>,
        n: usize,
    ) -> Result<Vec<Assessment>, StoreError>;

    async fn entities(&self) -> Result<Vec<EntitySummary>, StoreError>;

    /// Append `entries` to the scope unless it was seeded before or already
    /// holds assessments. Returns false when the scope was left untouched.
    async fn seed_scope(
        &self,
        entity_id: Option<&str>,
        entries: Vec<NewAssessment>,
    ) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct Partition {
    entries: Vec<Assessment>,
    seeded: bool,
}

type Key = Option<String>;

/// Process-local store. Each entity owns its own lock, so work on one
/// entity never waits on another entity's appends.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    partitions: RwLock<HashMap<Key, Arc<RwLock<Partition>>>>,
    next_id: AtomicI64,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, entity_id: Option<&str>) -> Result<Option<Arc<RwLock<Partition>>>, StoreError> {
        let partitions = self
            .partitions
            .read()
            .map_err(|_| StoreError::Poisoned(None))?;
        Ok(partitions.get(&entity_id.map(str::to_string)).cloned())
    }

    fn partition(&self, entity_id: Option<&str>) -> Result<Arc<RwLock<Partition>>, StoreError> {
        if let Some(existing) = self.existing(entity_id)? {
            return Ok(existing);
        }
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StoreError::Poisoned(None))?;
        Ok(partitions
            .entry(entity_id.map(str::to_string))
            .or_default()
            .clone())
    }

    fn push(&self, partition: &mut Partition, entry: NewAssessment) -> Assessment {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let assessment = entry.into_assessment(id);
        partition.entries.push(assessment.clone());
        assessment
    }
}

fn poisoned(entity_id: Option<&str>) -> StoreError {
    StoreError::Poisoned(entity_id.map(str::to_string))
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: NewAssessment) -> Result<Assessment, StoreError> {
        let entity_id = entry.entity_id.clone();
        let partition = self.partition(entity_id.as_deref())?;
        let mut guard = partition
            .write()
            .map_err(|_| poisoned(entity_id.as_deref()))?;
        Ok(self.push(&mut guard, entry))
    }

    async fn latest(&self, entity_id: Option<&str>) -> Result<Option<Assessment>, StoreError> {
        let Some(partition) = self.existing(entity_id)? else {
            return Ok(None);
        };
        let guard = partition.read().map_err(|_| poisoned(entity_id))?;
        Ok(guard.entries.last().cloned())
    }

    async fn recent(
        &self,
        entity_id: Option<&str>,
        n: usize,
    ) -> Result<Vec<Assessment>, StoreError> {
        let Some(partition) = self.existing(entity_id)? else {
            return Ok(Vec::new());
        };
        let guard = partition.read().map_err(|_| poisoned(entity_id))?;
        let start = guard.entries.len().saturating_sub(n);
        Ok(guard.entries[start..].to_vec())
    }

    async fn entities(&self) -> Result<Vec<EntitySummary>, StoreError> {
        let snapshot: Vec<(Key, Arc<RwLock<Partition>>)> = {
            let partitions = self
                .partitions
                .read()
                .map_err(|_| StoreError::Poisoned(None))?;
            partitions
                .iter()
                .map(|(key, partition)| (key.clone(), partition.clone()))
                .collect()
        };

        let mut out = Vec::with_capacity(snapshot.len());
        for (key, partition) in snapshot {
            let guard = partition.read().map_err(|_| poisoned(key.as_deref()))?;
            if guard.entries.is_empty() {
                continue;
            }
            out.push(EntitySummary {
                lag_score: guard.entries.last().map(|a| a.final_score).unwrap_or(0.0),
                assessments: guard.entries.len() as i64,
                entity_id: key,
            });
        }
        out.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(out)
    }

    async fn seed_scope(
        &self,
        entity_id: Option<&str>,
        entries: Vec<NewAssessment>,
    ) -> Result<bool, StoreError> {
        let partition = self.partition(entity_id)?;
        let mut guard = partition.write().map_err(|_| poisoned(entity_id))?;
        if guard.seeded || !guard.entries.is_empty() {
            return Ok(false);
        }
        guard.seeded = true;
        for mut entry in entries {
            entry.entity_id = entity_id.map(str::to_string);
            self.push(&mut guard, entry);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryStore, InMemoryHistoryStore};
    use crate::testing::new_assessment_fixture as new_entry;

    #[tokio::test]
    async fn latest_reflects_last_append() {
        let store = InMemoryHistoryStore::new();
        assert!(store.latest(Some("SAGARA")).await.unwrap().is_none());

        store.append(new_entry(Some("SAGARA"), 0.2)).await.unwrap();
        let second = store.append(new_entry(Some("SAGARA"), 0.35)).await.unwrap();

        let latest = store.latest(Some("SAGARA")).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.final_score, 0.35);
    }

    #[tokio::test]
    async fn sequence_ids_increase_per_entity() {
        let store = InMemoryHistoryStore::new();
        let mut previous = 0;
        for i in 0..5 {
            let entity = if i % 2 == 0 { Some("A") } else { Some("B") };
            store.append(new_entry(entity, 0.1)).await.unwrap();
        }
        for a in store.recent(Some("A"), 10).await.unwrap() {
            assert!(a.id > previous);
            previous = a.id;
        }
    }

    #[tokio::test]
    async fn recent_is_oldest_first_and_bounded() {
        let store = InMemoryHistoryStore::new();
        for score in [0.1, 0.2, 0.3, 0.4] {
            store.append(new_entry(None, score)).await.unwrap();
        }

        let recent = store.recent(None, 2).await.unwrap();
        let scores: Vec<f64> = recent.iter().map(|a| a.final_score).collect();
        assert_eq!(scores, vec![0.3, 0.4]);
        assert_eq!(store.recent(None, 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn entities_are_partitioned() {
        let store = InMemoryHistoryStore::new();
        store.append(new_entry(Some("SAYURA"), 0.5)).await.unwrap();
        store.append(new_entry(None, 0.1)).await.unwrap();

        assert_eq!(store.recent(Some("SAYURA"), 60).await.unwrap().len(), 1);
        assert_eq!(store.recent(None, 60).await.unwrap().len(), 1);
        assert!(store.recent(Some("UNKNOWN"), 60).await.unwrap().is_empty());

        let entities = store.entities().await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_id, None);
        assert_eq!(entities[1].entity_id.as_deref(), Some("SAYURA"));
        assert_eq!(entities[1].lag_score, 0.5);
    }

    #[tokio::test]
    async fn seed_scope_runs_once() {
        let store = InMemoryHistoryStore::new();
        let entries = vec![new_entry(None, 0.1), new_entry(None, 0.2)];

        assert!(store.seed_scope(Some("SHAKTHI"), entries.clone()).await.unwrap());
        assert!(!store.seed_scope(Some("SHAKTHI"), entries).await.unwrap());

        let history = store.recent(Some("SHAKTHI"), 60).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|a| a.entity_id.as_deref() == Some("SHAKTHI")));
    }

    #[tokio::test]
    async fn seed_scope_skips_entity_with_live_history() {
        let store = InMemoryHistoryStore::new();
        let live = store.append(new_entry(Some("SAYURA"), 0.46)).await.unwrap();

        let seeded = store
            .seed_scope(Some("SAYURA"), vec![new_entry(None, 0.1), new_entry(None, 0.2)])
            .await
            .unwrap();

        assert!(!seeded);
        assert_eq!(store.recent(Some("SAYURA"), 60).await.unwrap(), vec![live.clone()]);
        assert_eq!(store.latest(Some("SAYURA")).await.unwrap(), Some(live));
    }
}
