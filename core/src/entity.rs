use std::sync::Arc;

use crate::assessment::Assessment;
use crate::error::StoreError;
use crate::history::HistoryStore;

pub const DEFAULT_HISTORY_WINDOW: usize = 60;

/// Trimmed entity id; blank ids address the default entity.
pub fn normalize_entity_id(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Chaining state of one entity, read at the start of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityContext {
    pub entity_id: Option<String>,
    /// Final score of the most recent Assessment, or 0 without history
    pub lag_score: f64,
    /// Bounded recent history, oldest first
    pub history: Vec<Assessment>,
}

impl EntityContext {
    pub fn history_scores(&self) -> Vec<f64> {
        self.history.iter().map(|a| a.final_score).collect()
    }
}

/// Resolves an incoming entity id to its Lag State and recent history.
/// Unknown ids are not an error: they resolve to an empty history.
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn HistoryStore>,
    window: usize,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn HistoryStore>, window: usize) -> Self {
        Self {
            store,
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Computed fresh on every call; nothing is cached between cycles.
    pub async fn resolve(&self, entity_id: Option<&str>) -> Result<EntityContext, StoreError> {
        let entity_id = normalize_entity_id(entity_id);
        let history = self.store.recent(entity_id.as_deref(), self.window).await?;
        let lag_score = history.last().map(|a| a.final_score).unwrap_or(0.0);
        Ok(EntityContext {
            entity_id,
            lag_score,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{EntityResolver, normalize_entity_id};
    use crate::history::{HistoryStore, InMemoryHistoryStore};
    use crate::testing::new_assessment_fixture;

    #[test]
    fn normalize_trims_and_drops_blank_ids() {
        assert_eq!(normalize_entity_id(Some(" SAGARA ")).as_deref(), Some("SAGARA"));
        assert_eq!(normalize_entity_id(Some("  ")), None);
        assert_eq!(normalize_entity_id(None), None);
    }

    #[tokio::test]
    async fn unknown_entity_resolves_to_empty_history() {
        let resolver = EntityResolver::new(Arc::new(InMemoryHistoryStore::new()), 60);
        let ctx = resolver.resolve(Some("NEVER_SEEN")).await.unwrap();
        assert_eq!(ctx.lag_score, 0.0);
        assert!(ctx.history.is_empty());
        assert_eq!(ctx.entity_id.as_deref(), Some("NEVER_SEEN"));
    }

    #[tokio::test]
    async fn lag_tracks_latest_append() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let resolver = EntityResolver::new(store.clone(), 60);

        store.append(new_assessment_fixture(Some("VIJAYABAHU"), 0.22)).await.unwrap();
        assert_eq!(resolver.resolve(Some("VIJAYABAHU")).await.unwrap().lag_score, 0.22);

        store.append(new_assessment_fixture(Some("VIJAYABAHU"), 0.47)).await.unwrap();
        assert_eq!(resolver.resolve(Some("VIJAYABAHU")).await.unwrap().lag_score, 0.47);

        // Other entities are untouched.
        assert_eq!(resolver.resolve(None).await.unwrap().lag_score, 0.0);
    }

    #[tokio::test]
    async fn window_bounds_history() {
        let store = Arc::new(InMemoryHistoryStore::new());
        for i in 0..8 {
            store.append(new_assessment_fixture(None, i as f64 / 10.0)).await.unwrap();
        }
        let resolver = EntityResolver::new(store, 3);
        let ctx = resolver.resolve(None).await.unwrap();
        assert_eq!(ctx.history_scores(), vec![0.5, 0.6, 0.7]);
        assert_eq!(ctx.lag_score, 0.7);
    }
}
