//! Narrative generation with a per-attempt deadline, bounded retries and a deterministic
//! fallback. Narration never fails an analysis.

pub mod retry;

pub use retry::{BackoffSchedule, RetryPolicy, retry_transient};

use crate::error::DependencyError;
use crate::pipeline::providers::{NarrativeProvider, NarrativeRequest};
use crate::pipeline::types::Narrative;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::Timeout;
use tower::timeout::error::Elapsed;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::{debug, info, warn};

/// Adapts a [`NarrativeProvider`] to a tower [`Service`] so it can be layered.
#[derive(Clone)]
pub struct NarrativeService {
    provider: Arc<dyn NarrativeProvider>,
}

impl NarrativeService {
    pub fn new(provider: Arc<dyn NarrativeProvider>) -> Self {
        Self { provider }
    }
}

impl Service<NarrativeRequest> for NarrativeService {
    type Response = String;
    type Error = DependencyError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: NarrativeRequest) -> Self::Future {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move { provider.narrate(&request).await })
    }
}

/// Drives the narrative service: timeout per attempt, retries on transient failures,
/// templated fallback on exhaustion.
#[derive(Clone)]
pub struct Narrator {
    service: Timeout<NarrativeService>,
    policy: RetryPolicy,
    provider_name: &'static str,
}

impl Narrator {
    pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        provider: Arc<dyn NarrativeProvider>,
        attempt_timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        let provider_name = provider.name();
        let service = ServiceBuilder::new()
            .timeout(attempt_timeout)
            .service(NarrativeService::new(provider));
        Self {
            service,
            policy,
            provider_name,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Always yields a narrative: generated text, or the fallback sentence.
    pub async fn narrate(&self, request: NarrativeRequest) -> Narrative {
        match self.try_narrate(&request).await {
            Ok(text) => {
                debug!(
                    "Narrative for '{}' generated by {}",
                    request.label, self.provider_name
                );
                Narrative::generated(text)
            }
            Err(e) => {
                warn!(
                    "Narration for '{}' failed, using fallback text: {}",
                    request.label, e
                );
                Narrative::fallback(fallback_narrative(&request.label, &request.display_name))
            }
        }
    }

    async fn try_narrate(&self, request: &NarrativeRequest) -> Result<String, DependencyError> {
        let text = retry_transient(&self.policy, |attempt| {
            let service = self.service.clone();
            let request = request.clone();
            async move {
                if attempt > 0 {
                    info!("Narration attempt {} for '{}'", attempt + 1, request.label);
                }
                service.oneshot(request).await.map_err(into_dependency_error)
            }
        })
        .await?;

        if text.trim().is_empty() {
            return Err(DependencyError::InvalidResponse(
                "the generated narrative is empty".to_string(),
            ));
        }
        Ok(text)
    }
}

fn into_dependency_error(error: BoxError) -> DependencyError {
    if error.is::<Elapsed>() {
        return DependencyError::Timeout;
    }
    match error.downcast::<DependencyError>() {
        Ok(dependency) => *dependency,
        Err(other) => DependencyError::Connection(other.to_string()),
    }
}

/// Deterministic sentence used when no narrative could be generated.
pub fn fallback_narrative(label: &str, display_name: &str) -> String {
    let subject = if display_name == label {
        label.to_string()
    } else {
        format!("{display_name} ({label})")
    };
    format!(
        "This appears to be {subject}. A detailed description is not available right now, please try again later."
    )
}
