pub mod assessor;
pub mod audit;
pub mod client;

pub use assessor::GenerativeAssessor;
pub use audit::BiasAuditor;
pub use client::{ChatApi, ChatMessage, ChatRequest, LlmClient};

use std::sync::Arc;

/// Assessor and auditor bound to one shared chat backend. Present only
/// when an API key was configured at startup.
pub struct GenerativeLayer {
    pub assessor: GenerativeAssessor,
    pub auditor: BiasAuditor,
}

impl GenerativeLayer {
    pub fn new(backend: Arc<dyn ChatApi>) -> Self {
        Self {
            assessor: GenerativeAssessor::new(backend.clone()),
            auditor: BiasAuditor::new(backend),
        }
    }
}
