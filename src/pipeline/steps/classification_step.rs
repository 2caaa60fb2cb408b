use crate::error::{AppError, InferenceError};
use crate::pipeline::orchestration::{AnalysisContext, ProcessingStep, StepFlow};
use crate::pipeline::providers::ClassificationProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Classifies the original image restricted to the segmentation mask.
pub struct ClassificationStep {
    provider: Arc<dyn ClassificationProvider>,
}

impl ClassificationStep {
    pub fn new(provider: Arc<dyn ClassificationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProcessingStep for ClassificationStep {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let segmentation = context.segmentation.as_ref().ok_or_else(|| {
            AppError::Pipeline("Classification requires a segmentation mask".to_string())
        })?;

        let outcome = self
            .provider
            .classify(&context.image, &segmentation.mask)
            .await?;

        if !(0.0..=1.0).contains(&outcome.confidence) || outcome.ranked.is_empty() {
            return Err(InferenceError::Classification(format!(
                "{} returned an invalid distribution (confidence {})",
                self.provider.name(),
                outcome.confidence
            ))
            .into());
        }

        debug!(
            "Classified as '{}' with confidence {:.3}",
            outcome.label, outcome.confidence
        );
        context.classification = Some(outcome);
        Ok(StepFlow::Continue)
    }

    fn name(&self) -> &'static str {
        "ClassificationStep"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{FixedClassifier, solid_image};
    use crate::pipeline::types::{Mask, SegmentationOutcome};

    fn segmented_context() -> AnalysisContext {
        let mut context = AnalysisContext::new(solid_image(64, 64, [1, 2, 3]));
        context.segmentation = Some(SegmentationOutcome::new(Mask::full(64, 64), 0.8));
        context
    }

    #[tokio::test]
    async fn stores_the_outcome() {
        let step = ClassificationStep::new(Arc::new(FixedClassifier::returning("deer", 0.82)));
        let mut context = segmented_context();
        step.process(&mut context).await.unwrap();
        let outcome = context.classification.unwrap();
        assert_eq!(outcome.label, "deer");
        assert_eq!(outcome.ranked.len(), 3);
    }

    #[tokio::test]
    async fn without_a_mask_the_pipeline_is_misassembled() {
        let provider = Arc::new(FixedClassifier::returning("deer", 0.82));
        let step = ClassificationStep::new(provider.clone());
        let mut context = AnalysisContext::new(solid_image(64, 64, [1, 2, 3]));
        assert!(matches!(
            step.process(&mut context).await,
            Err(AppError::Pipeline(_))
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_rejected() {
        let step = ClassificationStep::new(Arc::new(FixedClassifier::returning("deer", 1.5)));
        let mut context = segmented_context();
        assert!(matches!(
            step.process(&mut context).await,
            Err(AppError::Inference(InferenceError::Classification(_)))
        ));
    }
}
