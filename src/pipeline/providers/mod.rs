//! Capability interfaces for the four inference stages, plus the production variants.
//!
//! Every provider is `Send + Sync` and shared behind an `Arc`, so one instance serves all
//! concurrent analyses. Test doubles implement the same traits.

pub mod color_contrast_segmenter;
pub mod device_limited;
pub mod prototype_classifier;
pub mod remote_narrative;
pub mod static_enrichment;

pub use color_contrast_segmenter::ColorContrastSegmenter;
pub use device_limited::DeviceLimited;
pub use prototype_classifier::{ClassPrototype, PrototypeClassifier};
pub use remote_narrative::RemoteNarrativeProvider;
pub use static_enrichment::StaticEnrichmentProvider;

use crate::error::{DependencyError, InferenceError};
use crate::pipeline::types::{
    ClassificationOutcome, DecodedImage, EnrichmentInfo, Mask, SeedPoint, SegmentationOutcome,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// Finds the foreground subject around a seed point.
#[async_trait]
pub trait SegmentationProvider: Send + Sync {
    async fn segment(
        &self,
        image: &DecodedImage,
        seed: SeedPoint,
    ) -> Result<SegmentationOutcome, InferenceError>;

    fn name(&self) -> &'static str;
}

/// Scores the masked subject against a class table.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(
        &self,
        image: &DecodedImage,
        mask: &Mask,
    ) -> Result<ClassificationOutcome, InferenceError>;

    fn name(&self) -> &'static str;
}

/// Reference data for a label. `Ok(None)` is a miss, not a failure.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn lookup(&self, label: &str) -> Result<Option<EnrichmentInfo>, DependencyError>;

    fn name(&self) -> &'static str;
}

/// Free-text description generator. Usually remote and slow.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    async fn narrate(&self, request: &NarrativeRequest) -> Result<String, DependencyError>;

    fn name(&self) -> &'static str;
}

/// Input handed to a [`NarrativeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub label: String,
    pub display_name: String,
    pub facts: IndexMap<String, String>,
}

impl NarrativeRequest {
    pub fn from_enrichment(label: &str, info: &EnrichmentInfo) -> Self {
        Self {
            label: label.to_string(),
            display_name: info.display_name.clone(),
            facts: info.facts.clone(),
        }
    }
}

#[async_trait]
impl<P: SegmentationProvider + ?Sized> SegmentationProvider for Arc<P> {
    async fn segment(
        &self,
        image: &DecodedImage,
        seed: SeedPoint,
    ) -> Result<SegmentationOutcome, InferenceError> {
        (**self).segment(image, seed).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[async_trait]
impl<P: ClassificationProvider + ?Sized> ClassificationProvider for Arc<P> {
    async fn classify(
        &self,
        image: &DecodedImage,
        mask: &Mask,
    ) -> Result<ClassificationOutcome, InferenceError> {
        (**self).classify(image, mask).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
