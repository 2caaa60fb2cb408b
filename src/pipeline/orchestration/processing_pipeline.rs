use crate::error::AppError;
use crate::pipeline::orchestration::analysis_context::AnalysisContext;
use crate::pipeline::orchestration::processing_step::{ProcessingStep, StepFlow};

/// Runs an analysis through a chain of steps, strictly in order
pub struct ProcessingPipeline {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl ProcessingPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: Box<dyn ProcessingStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub async fn process(&self, mut context: AnalysisContext) -> Result<AnalysisContext, AppError> {
        for step in &self.steps {
            tracing::debug!("Processing step: {}", step.name());
            if step.process(&mut context).await? == StepFlow::Finish {
                tracing::debug!("Step {} finished the analysis early", step.name());
                break;
            }
        }
        Ok(context)
    }
}

impl Default for ProcessingPipeline {
    fn default() -> Self {
        Self::new()
    }
}
