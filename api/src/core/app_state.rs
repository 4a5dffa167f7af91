use std::sync::Arc;

use chat_pipeline::ChatPipeline;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The initialized turn orchestrator.
    pub pipeline: Arc<ChatPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<ChatPipeline>) -> Self {
        Self { pipeline }
    }
}
