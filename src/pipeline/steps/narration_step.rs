use crate::error::AppError;
use crate::pipeline::narration::Narrator;
use crate::pipeline::orchestration::{AnalysisContext, ProcessingStep, StepFlow};
use crate::pipeline::providers::NarrativeRequest;
use async_trait::async_trait;

/// Generates the narrative. Never fails once enrichment has run.
pub struct NarrationStep {
    narrator: Narrator,
}

impl NarrationStep {
    pub fn new(narrator: Narrator) -> Self {
        Self { narrator }
    }
}

#[async_trait]
impl ProcessingStep for NarrationStep {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let (Some(classification), Some(enrichment)) =
            (context.classification.as_ref(), context.enrichment.as_ref())
        else {
            return Err(AppError::Pipeline(
                "Narration requires a classification and enrichment".to_string(),
            ));
        };

        let request = NarrativeRequest::from_enrichment(&classification.label, enrichment);
        context.narrative = Some(self.narrator.narrate(request).await);
        Ok(StepFlow::Continue)
    }

    fn name(&self) -> &'static str {
        "NarrationStep"
    }
}
