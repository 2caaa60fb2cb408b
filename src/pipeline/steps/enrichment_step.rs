use crate::error::AppError;
use crate::pipeline::orchestration::{AnalysisContext, ProcessingStep, StepFlow};
use crate::pipeline::providers::EnrichmentProvider;
use crate::pipeline::types::EnrichmentInfo;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Looks up reference facts for the label. A miss or a lookup failure yields the placeholder.
pub struct EnrichmentStep {
    provider: Arc<dyn EnrichmentProvider>,
}

impl EnrichmentStep {
    pub fn new(provider: Arc<dyn EnrichmentProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProcessingStep for EnrichmentStep {
    async fn process(&self, context: &mut AnalysisContext) -> Result<StepFlow, AppError> {
        let label = context
            .classification
            .as_ref()
            .map(|c| c.label.clone())
            .ok_or_else(|| {
                AppError::Pipeline("Enrichment requires a classification".to_string())
            })?;

        let info = match self.provider.lookup(&label).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug!("No reference data for '{}'", label);
                EnrichmentInfo::placeholder(&label)
            }
            Err(e) => {
                warn!(
                    "{} lookup for '{}' failed, using placeholder: {}",
                    self.provider.name(),
                    label,
                    e
                );
                EnrichmentInfo::placeholder(&label)
            }
        };

        context.enrichment = Some(info);
        Ok(StepFlow::Continue)
    }

    fn name(&self) -> &'static str {
        "EnrichmentStep"
    }
}
