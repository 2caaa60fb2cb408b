use crate::error::{AppError, InferenceError};
use crate::pipeline::orchestration::{AnalysisContext, ProcessingStep, StepFlow};
use crate::pipeline::providers::SegmentationProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds the subject around the image center.
pub struct SegmentationStep {
    provider: Arc<dyn SegmentationProvider>,
}

impl SegmentationStep {
    pub fn new(provider: Arc<dyn SegmentationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProcessingStep for SegmentationStep {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let mut outcome = self.provider.segment(&context.image, context.seed).await?;

        if !outcome.score.is_finite() {
            return Err(InferenceError::Segmentation(format!(
                "{} returned a non-finite score",
                self.provider.name()
            ))
            .into());
        }
        outcome.score = outcome.score.clamp(0.0, 1.0);

        let (width, height) = (context.image.width(), context.image.height());
        if outcome.mask.width() != width || outcome.mask.height() != height {
            warn!(
                "Mask is {}x{} but the image is {}x{}, resampling",
                outcome.mask.width(),
                outcome.mask.height(),
                width,
                height
            );
            outcome.mask = outcome.mask.resized(width, height);
        }

        debug!(
            "Segmented {} foreground pixels, score {:.3}",
            outcome.mask.foreground_count(),
            outcome.score
        );
        context.segmentation = Some(outcome);
        Ok(StepFlow::Continue)
    }

    fn name(&self) -> &'static str {
        "SegmentationStep"
    }
}
