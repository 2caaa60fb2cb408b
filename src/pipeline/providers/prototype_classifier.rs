use super::ClassificationProvider;
use crate::error::InferenceError;
use crate::pipeline::types::{ClassificationOutcome, DecodedImage, Mask, softmax};
use async_trait::async_trait;
use image::RgbImage;

/// One row of the class table: a label and the colour it is scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrototype {
    pub label: String,
    pub color: [u8; 3],
}

impl ClassPrototype {
    pub fn new(label: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }
}

/// Scores the masked subject's mean colour against per-class prototype colours and turns
/// the negative distances into a softmax distribution.
#[derive(Debug, Clone)]
pub struct PrototypeClassifier {
    labels: Vec<String>,
    colors: Vec<[f32; 3]>,
    temperature: f32,
}

impl PrototypeClassifier {
    pub const DEFAULT_TEMPERATURE: f32 = 12.0;

    pub fn new(classes: Vec<ClassPrototype>) -> Self {
        let labels = classes.iter().map(|c| c.label.clone()).collect();
        let colors = classes
            .iter()
            .map(|c| [c.color[0] as f32, c.color[1] as f32, c.color[2] as f32])
            .collect();
        Self {
            labels,
            colors,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }

    /// Lower temperatures sharpen the distribution.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The base animal table, in its canonical order.
    pub fn default_classes() -> Vec<ClassPrototype> {
        vec![
            ClassPrototype::new("dog", [160, 110, 60]),
            ClassPrototype::new("cat", [140, 130, 120]),
            ClassPrototype::new("lion", [200, 150, 70]),
            ClassPrototype::new("tiger", [220, 120, 40]),
            ClassPrototype::new("bear", [80, 55, 35]),
            ClassPrototype::new("horse", [120, 75, 40]),
            ClassPrototype::new("panda", [235, 235, 230]),
            ClassPrototype::new("fox", [210, 90, 30]),
            ClassPrototype::new("rabbit", [190, 180, 170]),
            ClassPrototype::new("deer", [150, 95, 55]),
            ClassPrototype::new("wolf", [110, 105, 100]),
            ClassPrototype::new("monkey", [100, 70, 45]),
            ClassPrototype::new("elephant", [130, 130, 135]),
            ClassPrototype::new("giraffe", [215, 170, 90]),
            ClassPrototype::new("zebra", [30, 30, 30]),
        ]
    }

    fn score(&self, rgb: &RgbImage, mask: &Mask) -> Result<ClassificationOutcome, InferenceError> {
        let mean = masked_mean(rgb, mask);
        let logits: Vec<f32> = self
            .colors
            .iter()
            .map(|proto| -distance(mean, *proto) / self.temperature)
            .collect();
        ClassificationOutcome::from_distribution(&self.labels, &softmax(&logits))
    }
}

impl Default for PrototypeClassifier {
    fn default() -> Self {
        Self::new(Self::default_classes())
    }
}

#[async_trait]
impl ClassificationProvider for PrototypeClassifier {
    async fn classify(
        &self,
        image: &DecodedImage,
        mask: &Mask,
    ) -> Result<ClassificationOutcome, InferenceError> {
        if self.temperature <= 0.0 || !self.temperature.is_finite() {
            return Err(InferenceError::Classification(format!(
                "invalid temperature {}",
                self.temperature
            )));
        }
        let shared = image.shared();
        let mask = mask.clone();
        let classifier = self.clone();
        // CPU bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let rgb = shared.to_rgb8();
            let mask = mask.resized(rgb.width(), rgb.height());
            classifier.score(&rgb, &mask)
        })
        .await
        .map_err(|e| InferenceError::Classification(format!("classification task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        "PrototypeClassifier"
    }
}

/// Mean colour of the foreground. Background pixels are treated as cropped away; an empty
/// mask falls back to the whole image.
fn masked_mean(rgb: &RgbImage, mask: &Mask) -> [f32; 3] {
    let use_all = mask.is_empty();
    let mut sum = [0f64; 3];
    let mut count = 0u64;
    for (x, y, pixel) in rgb.enumerate_pixels() {
        if use_all || mask.get(x, y) {
            for c in 0..3 {
                sum[c] += pixel.0[c] as f64;
            }
            count += 1;
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

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}
