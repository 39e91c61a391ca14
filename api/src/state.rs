use std::sync::Arc;

use oilwatch_core::history::HistoryStore;
use oilwatch_core::pipeline::ScoringPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ScoringPipeline,
    pub store: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new(pipeline: ScoringPipeline) -> Self {
        let store = pipeline.store().clone();
        Self { pipeline, store }
    }
}
