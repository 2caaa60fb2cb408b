mod analysis_result;
mod classification;
mod enrichment;
mod image_buffer;
mod segmentation;

pub use analysis_result::{AnalysisResult, Narrative, NarrativeSource, Recognition};
pub use classification::{ClassificationOutcome, RANKED_LEN, RankedLabel, rank_labels, softmax};
pub use enrichment::{DESCRIPTION_KEY, EnrichmentInfo, HABITAT_KEY, NO_INFORMATION};
pub use image_buffer::{DecodedImage, ImageBuffer, MIN_DIMENSION, SeedPoint};
pub use segmentation::{Mask, SegmentationOutcome};
