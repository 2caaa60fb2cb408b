use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// Number of candidates kept in a ranked classification.
pub const RANKED_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub label: String,
    pub confidence: f32,
    pub ranked: Vec<RankedLabel>,
}

impl ClassificationOutcome {
    /// Builds an outcome from a full class distribution, `labels[i]` scored by
    /// `probabilities[i]`. The class table order is the tie breaker.
    pub fn from_distribution(
        labels: &[String],
        probabilities: &[f32],
    ) -> Result<Self, InferenceError> {
        if labels.is_empty() {
            return Err(InferenceError::Classification(
                "the class table is empty".to_string(),
            ));
        }
        if labels.len() != probabilities.len() {
            return Err(InferenceError::Classification(format!(
                "{} labels but {} probabilities",
                labels.len(),
                probabilities.len()
            )));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(InferenceError::Classification(format!(
                "non-finite probability {bad}"
            )));
        }

        let ranked = rank_labels(labels, probabilities, RANKED_LEN);
        let top = &ranked[0];
        Ok(Self {
            label: top.label.clone(),
            confidence: top.confidence.clamp(0.0, 1.0),
            ranked,
        })
    }
}

/// Top `k` labels by descending probability. `sort_by` is stable, so exact ties keep
/// their class table order.
pub fn rank_labels(labels: &[String], probabilities: &[f32], k: usize) -> Vec<RankedLabel> {
    let mut order: Vec<usize> = (0..labels.len().min(probabilities.len())).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    order
        .into_iter()
        .take(k)
        .map(|i| RankedLabel {
            label: labels[i].clone(),
            confidence: probabilities[i],
        })
        .collect()
}

/// Numerically stable softmax. Degenerate input falls back to a uniform distribution.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return vec![];
    }
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    let mut exps = Vec::with_capacity(logits.len());
    for &l in logits {
        let e = (l - max_logit).exp();
        sum += e;
        exps.push(e);
    }
    if sum <= 0.0 || !sum.is_finite() {
        let n = logits.len() as f32;
        return vec![1.0 / n; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
