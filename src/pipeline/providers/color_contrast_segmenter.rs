use super::SegmentationProvider;
use crate::error::InferenceError;
use crate::pipeline::types::{DecodedImage, Mask, SeedPoint, SegmentationOutcome};
use async_trait::async_trait;
use image::RgbImage;
use std::collections::VecDeque;
use tracing::debug;

/// Deterministic segmenter: treats the mean border colour as background and grows the
/// subject from the seed over pixels that contrast with it.
#[derive(Debug, Clone)]
pub struct ColorContrastSegmenter {
    tolerance: f32,
}

impl ColorContrastSegmenter {
    pub const DEFAULT_TOLERANCE: f32 = 48.0;

    pub fn new() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    /// Euclidean RGB distance a pixel must exceed to count as foreground.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn segment_pixels(rgb: &RgbImage, seed: SeedPoint, tolerance: f32) -> SegmentationOutcome {
        let (width, height) = rgb.dimensions();
        let background = border_mean(rgb);
        let contrasting = Mask::from_fn(width, height, |x, y| {
            color_distance(rgb.get_pixel(x, y).0, background) > tolerance
        });

        let contrasting_count = contrasting.foreground_count();
        if contrasting_count == 0 {
            // Flat image: hand the whole frame to the classifier.
            return SegmentationOutcome::new(Mask::full(width, height), 0.0);
        }

        if !contrasting.get(seed.x, seed.y) {
            debug!("Seed {:?} lies on background, keeping every contrasting pixel", seed);
            return SegmentationOutcome::new(contrasting, 0.0);
        }

        let region = flood_fill(&contrasting, seed);
        let score = region.foreground_count() as f32 / contrasting_count as f32;
        SegmentationOutcome::new(region, score.clamp(0.0, 1.0))
    }
}

impl Default for ColorContrastSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentationProvider for ColorContrastSegmenter {
    async fn segment(
        &self,
        image: &DecodedImage,
        seed: SeedPoint,
    ) -> Result<SegmentationOutcome, InferenceError> {
        let shared = image.shared();
        let tolerance = self.tolerance;
        // CPU bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let rgb = shared.to_rgb8();
            Self::segment_pixels(&rgb, seed, tolerance)
        })
        .await
        .map_err(|e| InferenceError::Segmentation(format!("segmentation task failed: {e}")))
    }

    fn name(&self) -> &'static str {
        "ColorContrastSegmenter"
    }
}

fn border_mean(rgb: &RgbImage) -> [f32; 3] {
    let (width, height) = rgb.dimensions();
    let mut sum = [0f64; 3];
    let mut count = 0u64;
    for y in 0..height {
        for x in 0..width {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                let p = rgb.get_pixel(x, y).0;
                for c in 0..3 {
                    sum[c] += p[c] as f64;
                }
                count += 1;
            }
        }
    }
    if count == 0 {
        return [0.0; 3];
    }
    [
        (sum[0] / count as f64) as f32,
        (sum[1] / count as f64) as f32,
        (sum[2] / count as f64) as f32,
    ]
}

fn color_distance(pixel: [u8; 3], reference: [f32; 3]) -> f32 {
    let dr = pixel[0] as f32 - reference[0];
    let dg = pixel[1] as f32 - reference[1];
    let db = pixel[2] as f32 - reference[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

/// 4-connected region of `candidates` reachable from `seed`.
fn flood_fill(candidates: &Mask, seed: SeedPoint) -> Mask {
    let (width, height) = (candidates.width(), candidates.height());
    let mut region = Mask::empty(width, height);
    let mut queue = VecDeque::from([(seed.x, seed.y)]);
    region.set(seed.x, seed.y, true);

    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if candidates.get(nx, ny) && !region.get(nx, ny) {
                region.set(nx, ny, true);
                queue.push_back((nx, ny));
            }
        }
    }
    region
}
