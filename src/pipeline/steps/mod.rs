//! The five stages of an analysis, each a [`ProcessingStep`](crate::pipeline::orchestration::ProcessingStep).

pub mod classification_step;
pub mod confidence_gate_step;
pub mod enrichment_step;
pub mod narration_step;
pub mod segmentation_step;

pub use classification_step::ClassificationStep;
pub use confidence_gate_step::{ConfidenceGate, ConfidenceGateStep};
pub use enrichment_step::EnrichmentStep;
pub use narration_step::NarrationStep;
pub use segmentation_step::SegmentationStep;
