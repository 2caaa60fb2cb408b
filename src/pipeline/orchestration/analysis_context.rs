use crate::error::AppError;
use crate::pipeline::types::{
    AnalysisResult, ClassificationOutcome, DecodedImage, EnrichmentInfo, Narrative, Recognition,
    SeedPoint, SegmentationOutcome,
};
use indexmap::IndexMap;
use std::time::Instant;
use tracing::debug;

/// Mutable state threaded through the steps of a single analysis.
pub struct AnalysisContext {
    pub image: DecodedImage,
    pub seed: SeedPoint,
    pub segmentation: Option<SegmentationOutcome>,
    pub classification: Option<ClassificationOutcome>,
    pub recognition: Option<Recognition>,
    pub enrichment: Option<EnrichmentInfo>,
    pub narrative: Option<Narrative>,
    pub metrics: AnalysisMetrics,
    processing_start: Instant,
}

impl AnalysisContext {
    pub fn new(image: DecodedImage) -> Self {
        let seed = image.center();
        Self {
            image,
            seed,
            segmentation: None,
            classification: None,
            recognition: None,
            enrichment: None,
            narrative: None,
            metrics: AnalysisMetrics::new(),
            processing_start: Instant::now(),
        }
    }

    /// Assembles the immutable result. Fails if a step that should have run left its slot empty.
    pub fn into_result(mut self) -> Result<AnalysisResult, AppError> {
        self.metrics.finalize(self.processing_start);
        debug!(
            "Analysis assembled in {}us",
            self.metrics.total_processing_duration_us
        );

        let segmentation_score = self
            .segmentation
            .as_ref()
            .map(|s| s.score)
            .ok_or_else(|| missing("segmentation"))?;
        let classification = self
            .classification
            .ok_or_else(|| missing("classification"))?;

        match self.recognition.ok_or_else(|| missing("recognition"))? {
            Recognition::LowConfidence => Ok(AnalysisResult::low_confidence(
                classification,
                segmentation_score,
            )),
            Recognition::Confident => {
                let enrichment = self.enrichment.ok_or_else(|| missing("enrichment"))?;
                let narrative = self.narrative.ok_or_else(|| missing("narrative"))?;
                Ok(AnalysisResult::recognized(
                    classification,
                    segmentation_score,
                    enrichment,
                    narrative,
                ))
            }
        }
    }
}

fn missing(stage: &str) -> AppError {
    AppError::Pipeline(format!("The {} stage produced no output", stage))
}

/// Per-step timings collected during one analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisMetrics {
    step_durations_us: IndexMap<&'static str, u64>,
    pub total_processing_duration_us: u64,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_duration(&mut self, step: &'static str, duration_us: u64) {
        self.step_durations_us.insert(step, duration_us);
    }

    pub fn step_duration_us(&self, step: &str) -> Option<u64> {
        self.step_durations_us.get(step).copied()
    }

    /// Steps in the order they ran.
    pub fn steps(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.step_durations_us.keys().copied()
    }

    pub fn finalize(&mut self, start_time: Instant) {
        self.total_processing_duration_us = start_time.elapsed().as_micros() as u64;
    }
}
