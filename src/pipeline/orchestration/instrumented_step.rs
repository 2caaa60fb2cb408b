use crate::error::AppError;
use crate::pipeline::orchestration::analysis_context::AnalysisContext;
use crate::pipeline::orchestration::processing_step::{ProcessingStep, StepFlow};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, instrument};

/// Wraps a ProcessingStep with timing, logging and error tracking
pub struct InstrumentedStep<S> {
    inner: S,
    step_name: &'static str,
}

impl<S> InstrumentedStep<S> {
    pub fn new(step: S, step_name: &'static str) -> Self {
        Self {
            inner: step,
            step_name,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S> ProcessingStep for InstrumentedStep<S>
where
    S: ProcessingStep,
{
    #[instrument(skip(self, context), fields(step = %self.step_name))]
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let start = Instant::now();
        debug!("Starting step: {}", self.step_name);

        let result = self.inner.process(context).await;

        let duration_us = start.elapsed().as_micros() as u64;
        context.metrics.record_duration(self.step_name, duration_us);

        match &result {
            Ok(_) => {
                debug!(
                    "Completed step '{}' successfully in {}us",
                    self.step_name, duration_us
                );
            }
            Err(e) => {
                tracing::error!(
                    "Step '{}' failed after {}us: {}",
                    self.step_name,
                    duration_us,
                    e
                );
            }
        }

        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Extension trait to easily wrap steps with instrumentation
pub trait StepInstrumentation: Sized {
    fn instrumented(self, name: &'static str) -> InstrumentedStep<Self>;
}

impl<S> StepInstrumentation for S
where
    S: ProcessingStep,
{
    fn instrumented(self, name: &'static str) -> InstrumentedStep<Self> {
        InstrumentedStep::new(self, name)
    }
}
