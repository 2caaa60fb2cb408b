use super::{ClassificationOutcome, EnrichmentInfo, RankedLabel};
use serde::{Deserialize, Serialize};

/// Whether the classification cleared the confidence gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recognition {
    Confident,
    /// "Not confidently recognized": enrichment and narration were skipped.
    LowConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
}

impl Narrative {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: NarrativeSource::Generated,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: NarrativeSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == NarrativeSource::Fallback
    }
}

/// Completed analysis. Fields are private so a result cannot change after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    label: String,
    confidence: f32,
    ranked: Vec<RankedLabel>,
    recognition: Recognition,
    segmentation_score: f32,
    enrichment: Option<EnrichmentInfo>,
    narrative: Option<Narrative>,
    image_ref: Option<String>,
}

impl AnalysisResult {
    pub fn recognized(
        classification: ClassificationOutcome,
        segmentation_score: f32,
        enrichment: EnrichmentInfo,
        narrative: Narrative,
    ) -> Self {
        Self {
            label: classification.label,
            confidence: classification.confidence,
            ranked: classification.ranked,
            recognition: Recognition::Confident,
            segmentation_score,
            enrichment: Some(enrichment),
            narrative: Some(narrative),
            image_ref: None,
        }
    }

    pub fn low_confidence(classification: ClassificationOutcome, segmentation_score: f32) -> Self {
        Self {
            label: classification.label,
            confidence: classification.confidence,
            ranked: classification.ranked,
            recognition: Recognition::LowConfidence,
            segmentation_score,
            enrichment: None,
            narrative: None,
            image_ref: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn ranked(&self) -> &[RankedLabel] {
        &self.ranked
    }

    pub fn recognition(&self) -> Recognition {
        self.recognition
    }

    pub fn is_confident(&self) -> bool {
        self.recognition == Recognition::Confident
    }

    pub fn segmentation_score(&self) -> f32 {
        self.segmentation_score
    }

    pub fn enrichment(&self) -> Option<&EnrichmentInfo> {
        self.enrichment.as_ref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.enrichment.as_ref().map(|e| e.display_name.as_str())
    }

    pub fn narrative(&self) -> Option<&Narrative> {
        self.narrative.as_ref()
    }

    pub fn narrative_text(&self) -> Option<&str> {
        self.narrative.as_ref().map(|n| n.text.as_str())
    }

    pub fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deer() -> ClassificationOutcome {
        ClassificationOutcome {
            label: "deer".to_string(),
            confidence: 0.82,
            ranked: vec![
                RankedLabel {
                    label: "deer".to_string(),
                    confidence: 0.82,
                },
                RankedLabel {
                    label: "horse".to_string(),
                    confidence: 0.1,
                },
                RankedLabel {
                    label: "fox".to_string(),
                    confidence: 0.05,
                },
            ],
        }
    }

    #[test]
    fn low_confidence_results_carry_no_enrichment() {
        let result = AnalysisResult::low_confidence(deer(), 0.9);
        assert!(!result.is_confident());
        assert_eq!(result.recognition(), Recognition::LowConfidence);
        assert!(result.enrichment().is_none());
        assert!(result.narrative().is_none());
        assert_eq!(result.ranked().len(), 3);
    }

    #[test]
    fn serializes_with_snake_case_discriminants() {
        let result = AnalysisResult::recognized(
            deer(),
            0.9,
            EnrichmentInfo::new("사슴"),
            Narrative::fallback("사슴 (deer) was recognized."),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "deer");
        assert_eq!(json["recognition"], "confident");
        assert_eq!(json["enrichment"]["display_name"], "사슴");
        assert_eq!(json["narrative"]["source"], "fallback");
        assert!(json["image_ref"].is_null());

        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
