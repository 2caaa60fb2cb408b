//! Shared test doubles and image fixtures.

use crate::error::{DependencyError, InferenceError};
use crate::pipeline::providers::{
    ClassificationProvider, EnrichmentProvider, NarrativeProvider, NarrativeRequest,
    SegmentationProvider,
};
use crate::pipeline::types::{
    ClassificationOutcome, DecodedImage, EnrichmentInfo, Mask, RankedLabel, SeedPoint,
    SegmentationOutcome,
};
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
        width,
        height,
        Rgb(color),
    ));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DecodedImage {
    DecodedImage::new(DynamicImage::ImageRgb8(
        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb(color)),
    ))
}

/// Background-coloured image with a `2 * half` square of `foreground` at its center.
pub fn centered_square_image(
    width: u32,
    height: u32,
    half: u32,
    background: [u8; 3],
    foreground: [u8; 3],
) -> DecodedImage {
    let (cx, cy) = (width / 2, height / 2);
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(width, height, |x, y| {
        if x + half >= cx && x < cx + half && y + half >= cy && y < cy + half {
            Rgb(foreground)
        } else {
            Rgb(background)
        }
    });
    DecodedImage::new(DynamicImage::ImageRgb8(img))
}

pub fn deer_narrative_request() -> NarrativeRequest {
    let mut facts = IndexMap::new();
    facts.insert("description".to_string(), "A graceful herbivore.".to_string());
    NarrativeRequest {
        label: "deer".to_string(),
        display_name: "사슴".to_string(),
        facts,
    }
}

pub fn classification(label: &str, confidence: f32) -> ClassificationOutcome {
    let mut ranked = vec![RankedLabel {
        label: label.to_string(),
        confidence,
    }];
    let rest = (1.0 - confidence).max(0.0) / 2.0;
    for runner_up in ["horse", "fox"] {
        ranked.push(RankedLabel {
            label: runner_up.to_string(),
            confidence: rest.min(confidence),
        });
    }
    ClassificationOutcome {
        label: label.to_string(),
        confidence,
        ranked,
    }
}

/// Segmenter returning a full mask with a fixed score, or a scripted failure.
pub struct FixedSegmenter {
    result: Result<f32, InferenceError>,
    calls: AtomicUsize,
    seeds: Mutex<Vec<SeedPoint>>,
}

impl FixedSegmenter {
    pub fn scoring(score: f32) -> Self {
        Self {
            result: Ok(score),
            calls: AtomicUsize::new(0),
            seeds: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(InferenceError::Segmentation(message.to_string())),
            calls: AtomicUsize::new(0),
            seeds: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seeds(&self) -> Vec<SeedPoint> {
        self.seeds.lock().unwrap().clone()
    }
}

#[async_trait]
impl SegmentationProvider for FixedSegmenter {
    async fn segment(
        &self,
        image: &DecodedImage,
        seed: SeedPoint,
    ) -> Result<SegmentationOutcome, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seeds.lock().unwrap().push(seed);
        let score = self.result.clone()?;
        Ok(SegmentationOutcome::new(
            Mask::full(image.width(), image.height()),
            score,
        ))
    }

    fn name(&self) -> &'static str {
        "FixedSegmenter"
    }
}

pub struct FixedClassifier {
    result: Result<ClassificationOutcome, InferenceError>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn returning(label: &str, confidence: f32) -> Self {
        Self {
            result: Ok(classification(label, confidence)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(InferenceError::Classification(message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationProvider for FixedClassifier {
    async fn classify(
        &self,
        _image: &DecodedImage,
        _mask: &Mask,
    ) -> Result<ClassificationOutcome, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        "FixedClassifier"
    }
}

/// Enrichment double that counts lookups.
pub struct CountingEnrichment {
    result: Result<Option<EnrichmentInfo>, DependencyError>,
    calls: AtomicUsize,
}

impl CountingEnrichment {
    pub fn found(info: EnrichmentInfo) -> Self {
        Self {
            result: Ok(Some(info)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            result: Ok(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: DependencyError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentProvider for CountingEnrichment {
    async fn lookup(&self, _label: &str) -> Result<Option<EnrichmentInfo>, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        "CountingEnrichment"
    }
}

/// Narrative double replaying a script; the last entry repeats once the script runs out.
pub struct ScriptedNarrator {
    script: Mutex<VecDeque<Result<String, DependencyError>>>,
    last: Result<String, DependencyError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedNarrator {
    pub fn new(script: Vec<Result<String, DependencyError>>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| Err(DependencyError::NotConfigured("empty script".into())));
        Self {
            script: Mutex::new(script.into()),
            last,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_ok(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn always_err(error: DependencyError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeProvider for ScriptedNarrator {
    async fn narrate(&self, _request: &NarrativeRequest) -> Result<String, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next
    }

    fn name(&self) -> &'static str {
        "ScriptedNarrator"
    }
}
