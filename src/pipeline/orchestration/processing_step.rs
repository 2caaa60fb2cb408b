use crate::error::AppError;
use crate::pipeline::orchestration::analysis_context::AnalysisContext;
use async_trait::async_trait;

/// What the pipeline does after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlow {
    Continue,
    /// Skip the remaining steps and assemble what the context holds.
    Finish,
}

/// Chain of Responsibility pattern for the analysis pipeline
#[async_trait]
pub trait ProcessingStep: Send + Sync {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError>;
    fn name(&self) -> &'static str;
}
