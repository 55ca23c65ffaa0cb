pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::bundle::ModelProvider;
use crate::triage::TriageOrchestrator;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TriageOrchestrator>,
    pub provider: Arc<ModelProvider>,
}

impl AppState {
    pub fn new(orchestrator: Arc<TriageOrchestrator>, provider: Arc<ModelProvider>) -> Self {
        Self {
            orchestrator,
            provider,
        }
    }
}
