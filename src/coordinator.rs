use crate::{
    config::Configuration,
    error::AppError,
    http::AppState,
    pipeline::{
        narration::RetryPolicy,
        orchestration::{AnalysisOrchestrator, OrchestratorBuilder},
        providers::{
            ClassificationProvider, ColorContrastSegmenter, EnrichmentProvider, NarrativeProvider,
            PrototypeClassifier, RemoteNarrativeProvider, SegmentationProvider,
            StaticEnrichmentProvider,
        },
        types::{AnalysisResult, ImageBuffer},
    },
    store::{Clock, ReadPolicy, ResultHandle, ResultStore, SystemClock, spawn_sweeper},
};
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns the orchestrator, the result store and the background sweeper.
pub struct Coordinator {
    configuration: Configuration,
    orchestrator: Arc<AnalysisOrchestrator>,
    store: Arc<ResultStore>,
    sweeper_task: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(
        configuration: Configuration,
        orchestrator: AnalysisOrchestrator,
        store: ResultStore,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let store = Arc::new(store);
        let sweeper_task = spawn_sweeper(
            Arc::clone(&store),
            configuration.store.sweep_interval(),
            cancel_token.clone(),
        );

        Self {
            configuration,
            orchestrator: Arc::new(orchestrator),
            store,
            sweeper_task,
            cancel_token,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn orchestrator(&self) -> Arc<AnalysisOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn store(&self) -> Arc<ResultStore> {
        Arc::clone(&self.store)
    }

    /// Shared state for the HTTP handlers.
    pub fn app_state(&self) -> AppState {
        AppState::new(self.orchestrator(), self.store())
    }

    /// Analyses `bytes` and, only once the result is fully assembled, stores it.
    pub async fn analyze_and_store(
        &self,
        bytes: impl Into<Bytes>,
    ) -> Result<(ResultHandle, Arc<AnalysisResult>), AppError> {
        let result = Arc::new(self.orchestrator.analyze(ImageBuffer::new(bytes)).await?);
        let handle = self.store.store(Arc::clone(&result))?;
        Ok((handle, result))
    }

    pub fn fetch(&self, handle: &ResultHandle) -> Option<Arc<AnalysisResult>> {
        self.store.fetch(handle)
    }

    pub fn stop(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Stopping coordinator");
        }
        self.cancel_token.cancel();
        self.sweeper_task.abort();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    segmentation: Option<Arc<dyn SegmentationProvider>>,
    classification: Option<Arc<dyn ClassificationProvider>>,
    enrichment: Option<Arc<dyn EnrichmentProvider>>,
    narrative: Option<Arc<dyn NarrativeProvider>>,
    retry_policy: Option<RetryPolicy>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            segmentation: None,
            classification: None,
            enrichment: None,
            narrative: None,
            retry_policy: None,
            clock: None,
        }
    }

    // Sets the confidence threshold, this will override the configuration.
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.configuration.pipeline.confidence_threshold = threshold;
        self
    }

    // Sets the result TTL in seconds, this will override the configuration.
    pub fn ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.configuration.store.ttl_secs = ttl_secs;
        self
    }

    // Sets the read policy, this will override the configuration.
    pub fn read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.configuration.store.read_policy = read_policy;
        self
    }

    // Sets the narration retry count, this will override the configuration.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.configuration.narrative.max_retries = max_retries;
        self
    }

    // Replaces the configured backoff entirely, e.g. with an explicit schedule.
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn segmentation(mut self, provider: Arc<dyn SegmentationProvider>) -> Self {
        self.segmentation = Some(provider);
        self
    }

    pub fn classification(mut self, provider: Arc<dyn ClassificationProvider>) -> Self {
        self.classification = Some(provider);
        self
    }

    pub fn enrichment(mut self, provider: Arc<dyn EnrichmentProvider>) -> Self {
        self.enrichment = Some(provider);
        self
    }

    pub fn narrative(mut self, provider: Arc<dyn NarrativeProvider>) -> Self {
        self.narrative = Some(provider);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Must be called inside a tokio runtime; the sweeper is spawned immediately.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let configuration = self.configuration;
        configuration.validate().map_err(AppError::Config)?;
        let pipeline = &configuration.pipeline;

        let segmentation = match self.segmentation {
            Some(provider) => provider,
            None => Arc::new(
                ColorContrastSegmenter::new().with_tolerance(pipeline.segmentation_tolerance),
            ),
        };
        let classification = match self.classification {
            Some(provider) => provider,
            None => Arc::new(
                PrototypeClassifier::default().with_temperature(pipeline.classifier_temperature),
            ),
        };
        let enrichment = match self.enrichment {
            Some(provider) => provider,
            None => Arc::new(StaticEnrichmentProvider::with_default_animals()),
        };
        let narrative = match self.narrative {
            Some(provider) => provider,
            None => Arc::new(RemoteNarrativeProvider::from_settings(
                &configuration.narrative,
            )?),
        };
        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| configuration.narrative.retry_policy());

        let orchestrator = OrchestratorBuilder::new()
            .segmentation(segmentation)
            .classification(classification)
            .enrichment(enrichment)
            .narrative(narrative)
            .confidence_threshold(pipeline.confidence_threshold)
            .min_dimension(pipeline.min_dimension)
            .device_concurrency(pipeline.device_concurrency)
            .attempt_timeout(configuration.narrative.attempt_timeout())
            .retry_policy(retry_policy)
            .build()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = ResultStore::new(configuration.store.ttl())?
            .with_clock(clock)
            .with_read_policy(configuration.store.read_policy)
            .with_sweep_on_store(configuration.store.sweep_on_store);

        Ok(Coordinator::new(configuration, orchestrator, store))
    }
}
