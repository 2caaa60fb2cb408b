//! Thin axum surface over the orchestrator and the result store.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::router;

use crate::config::ServerSettings;
use crate::error::AppError;
use crate::pipeline::AnalysisOrchestrator;
use crate::store::ResultStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared by every handler. The store is injected here rather than living in a global.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub store: Arc<ResultStore>,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, store: Arc<ResultStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }
}

/// Serves until `shutdown` is cancelled, then drains in-flight requests.
pub async fn serve(
    state: AppState,
    settings: &ServerSettings,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let app = router(state, settings.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(settings.address()).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
