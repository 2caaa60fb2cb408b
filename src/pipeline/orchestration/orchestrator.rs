use crate::error::AppError;
use crate::pipeline::narration::{Narrator, RetryPolicy};
use crate::pipeline::orchestration::{
    AnalysisContext, ProcessingPipeline, StepInstrumentation,
};
use crate::pipeline::providers::{
    ClassificationProvider, DeviceLimited, EnrichmentProvider, NarrativeProvider,
    SegmentationProvider,
};
use crate::pipeline::steps::{
    ClassificationStep, ConfidenceGate, ConfidenceGateStep, EnrichmentStep, NarrationStep,
    SegmentationStep,
};
use crate::pipeline::types::{AnalysisResult, ImageBuffer, MIN_DIMENSION};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Sequences validation, segmentation, classification, the confidence gate, enrichment and
/// narration for one image at a time. Holds no per-request state, so one instance serves
/// every concurrent request. Never touches the result store.
pub struct AnalysisOrchestrator {
    pipeline: ProcessingPipeline,
    min_dimension: u32,
}

impl AnalysisOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn min_dimension(&self) -> u32 {
        self.min_dimension
    }

    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn analyze(&self, image: ImageBuffer) -> Result<AnalysisResult, AppError> {
        let decoded = image.validate(self.min_dimension)?;
        let context = self.pipeline.process(AnalysisContext::new(decoded)).await?;
        let result = context.into_result()?;
        info!(
            "Analysis complete: '{}' ({:.3}, {:?})",
            result.label(),
            result.confidence(),
            result.recognition()
        );
        Ok(result)
    }

    /// Like [`analyze`](Self::analyze), but abandons the work (including any in-flight
    /// narration) as soon as `cancel` fires.
    pub async fn analyze_until_cancelled(
        &self,
        image: ImageBuffer,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AppError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Analysis cancelled");
                Err(AppError::Cancelled)
            }
            result = self.analyze(image) => result,
        }
    }
}

pub struct OrchestratorBuilder {
    segmentation: Option<Arc<dyn SegmentationProvider>>,
    classification: Option<Arc<dyn ClassificationProvider>>,
    enrichment: Option<Arc<dyn EnrichmentProvider>>,
    narrative: Option<Arc<dyn NarrativeProvider>>,
    confidence_threshold: f32,
    min_dimension: u32,
    device_concurrency: usize,
    attempt_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            segmentation: None,
            classification: None,
            enrichment: None,
            narrative: None,
            confidence_threshold: ConfidenceGate::DEFAULT_THRESHOLD,
            min_dimension: MIN_DIMENSION,
            device_concurrency: 1,
            attempt_timeout: Narrator::DEFAULT_ATTEMPT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn segmentation(mut self, provider: Arc<dyn SegmentationProvider>) -> Self {
        self.segmentation = Some(provider);
        self
    }

    pub fn classification(mut self, provider: Arc<dyn ClassificationProvider>) -> Self {
        self.classification = Some(provider);
        self
    }

    pub fn enrichment(mut self, provider: Arc<dyn EnrichmentProvider>) -> Self {
        self.enrichment = Some(provider);
        self
    }

    pub fn narrative(mut self, provider: Arc<dyn NarrativeProvider>) -> Self {
        self.narrative = Some(provider);
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn min_dimension(mut self, min_dimension: u32) -> Self {
        self.min_dimension = min_dimension;
        self
    }

    // Segmentation and classification share one accelerator and queue for its permits.
    pub fn device_concurrency(mut self, device_concurrency: usize) -> Self {
        self.device_concurrency = device_concurrency;
        self
    }

    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn build(self) -> Result<AnalysisOrchestrator, AppError> {
        let segmentation = self
            .segmentation
            .ok_or(AppError::Config("Segmentation provider not set".to_string()))?;
        let classification = self
            .classification
            .ok_or(AppError::Config("Classification provider not set".to_string()))?;
        let enrichment = self
            .enrichment
            .ok_or(AppError::Config("Enrichment provider not set".to_string()))?;
        let narrative = self
            .narrative
            .ok_or(AppError::Config("Narrative provider not set".to_string()))?;

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AppError::Config(format!(
                "Confidence threshold {} is outside [0, 1]",
                self.confidence_threshold
            )));
        }

        let device = Arc::new(Semaphore::new(self.device_concurrency.max(1)));
        let segmentation = DeviceLimited::sharing(segmentation, Arc::clone(&device));
        let classification = DeviceLimited::sharing(classification, device);
        let narrator = Narrator::new(narrative, self.attempt_timeout, self.retry_policy);

        let pipeline = ProcessingPipeline::new()
            .add_step(Box::new(
                SegmentationStep::new(Arc::new(segmentation)).instrumented("segmentation"),
            ))
            .add_step(Box::new(
                ClassificationStep::new(Arc::new(classification)).instrumented("classification"),
            ))
            .add_step(Box::new(
                ConfidenceGateStep::new(ConfidenceGate::new(self.confidence_threshold))
                    .instrumented("confidence_gate"),
            ))
            .add_step(Box::new(
                EnrichmentStep::new(enrichment).instrumented("enrichment"),
            ))
            .add_step(Box::new(
                NarrationStep::new(narrator).instrumented("narration"),
            ));

        Ok(AnalysisOrchestrator {
            pipeline,
            min_dimension: self.min_dimension,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
