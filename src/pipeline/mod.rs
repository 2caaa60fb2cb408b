pub mod narration;
pub mod orchestration;
pub mod providers;
pub mod steps;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestration::{AnalysisOrchestrator, OrchestratorBuilder};
pub use types::{AnalysisResult, ImageBuffer};
