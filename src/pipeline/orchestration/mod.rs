pub mod analysis_context;
pub mod instrumented_step;
pub mod orchestrator;
pub mod processing_pipeline;
pub mod processing_step;

pub use analysis_context::{AnalysisContext, AnalysisMetrics};
pub use instrumented_step::{InstrumentedStep, StepInstrumentation};
pub use orchestrator::{AnalysisOrchestrator, OrchestratorBuilder};
pub use processing_pipeline::ProcessingPipeline;
pub use processing_step::{ProcessingStep, StepFlow};
