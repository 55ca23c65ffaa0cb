/// Decision pipeline: the safety gate, the orchestrated tier cascade,
/// the deterministic rule floor, and wearable-stream screening.
pub mod orchestrator;
pub mod rules;
pub mod safety;
pub mod wearable;

pub use orchestrator::{TriageOrchestrator, TriageState};
pub use wearable::WearableStreams;
