use crate::error::AppError;
use crate::pipeline::orchestration::{AnalysisContext, ProcessingStep, StepFlow};
use crate::pipeline::types::Recognition;
use async_trait::async_trait;
use tracing::info;

/// Minimum classification confidence for a result to be enriched and narrated. Inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub const DEFAULT_THRESHOLD: f32 = 0.4;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn admits(&self, confidence: f32) -> bool {
        confidence >= self.threshold
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// Ends the analysis early when the classifier is unsure.
pub struct ConfidenceGateStep {
    gate: ConfidenceGate,
}

impl ConfidenceGateStep {
    pub fn new(gate: ConfidenceGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl ProcessingStep for ConfidenceGateStep {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let classification = context.classification.as_ref().ok_or_else(|| {
            AppError::Pipeline("The confidence gate requires a classification".to_string())
        })?;

        if self.gate.admits(classification.confidence) {
            context.recognition = Some(Recognition::Confident);
            return Ok(StepFlow::Continue);
        }

        info!(
            "'{}' at {:.3} is below the {:.2} threshold, skipping enrichment and narration",
            classification.label,
            classification.confidence,
            self.gate.threshold()
        );
        context.recognition = Some(Recognition::LowConfidence);
        Ok(StepFlow::Finish)
    }

    fn name(&self) -> &'static str {
        "ConfidenceGateStep"
    }
}
