use super::{ApiError, AppState};
use crate::error::{AppError, ValidationError};
use crate::pipeline::types::{AnalysisResult, ImageBuffer};
use crate::store::ResultHandle;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/results/{handle}", get(result_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Form field carrying the image in multipart uploads.
pub const UPLOAD_FIELD: &str = "file";

/// Image bytes taken from the raw body, or from the `file` field of a multipart form.
struct Upload(Bytes);

impl<S: Send + Sync> FromRequest<S> for Upload {
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(request.headers()) {
            return Bytes::from_request(request, state)
                .await
                .map(Upload)
                .map_err(IntoResponse::into_response);
        }

        let mut form = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        while let Some(field) = form
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            if field.name() == Some(UPLOAD_FIELD) {
                return field
                    .bytes()
                    .await
                    .map(Upload)
                    .map_err(IntoResponse::into_response);
            }
        }

        let missing = AppError::from(ValidationError::MissingField(UPLOAD_FIELD));
        Err(ApiError::from(missing).into_response())
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    inline: bool,
}

/// Runs the pipeline on the uploaded image. Inline requests get the result directly;
/// everyone else gets a redirect to the stored copy.
async fn analyze_handler(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    Upload(body): Upload,
) -> Result<Response, ApiError> {
    debug!("Received {} byte upload", body.len());
    let result = state.orchestrator.analyze(ImageBuffer::new(body)).await?;

    if params.inline {
        return Ok(Json(result).into_response());
    }

    let handle = state.store.store(result)?;
    info!("Analysis stored as {}", handle);
    let location = format!("/results/{}", handle);
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        Json(json!({ "handle": handle })),
    )
        .into_response())
}

async fn result_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Arc<AnalysisResult>>, ApiError> {
    let not_found = || ApiError::NotFound(format!("No live result for handle '{}'", handle));
    let parsed = handle.parse::<ResultHandle>().map_err(|_| not_found())?;
    state.store.fetch(&parsed).map(Json).ok_or_else(not_found)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "stored_results": state.store.len(),
    }))
}
