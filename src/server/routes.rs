use std::future::Future;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::select::StreamQuality;

use super::{AppState, ENDPOINTS};

const DEFAULT_SEARCH_LIMIT: usize = 4;
const MAX_SEARCH_LIMIT: usize = 50;

/// A [`ResolveError`] on its way out as a JSON reply.
pub struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ResolveError::Validation(rejection.body_text()))
    }
}

pub fn status_for(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::Validation(_) => StatusCode::BAD_REQUEST,
        ResolveError::NotFound | ResolveError::NoVariant => StatusCode::NOT_FOUND,
        ResolveError::Upstream { .. }
        | ResolveError::UpstreamAuth
        | ResolveError::CredentialAcquisition(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        } else {
            debug!(error = %self.0, "Request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ResolveError::Validation(format!("Missing query parameter: {name}")).into())
}

fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(DEFAULT_SEARCH_LIMIT);
    };
    match raw.parse::<usize>() {
        Ok(n) if (1..=MAX_SEARCH_LIMIT).contains(&n) => Ok(n),
        _ => Err(ResolveError::Validation(format!(
            "Invalid limit: {raw} (expected 1-{MAX_SEARCH_LIMIT})"
        ))
        .into()),
    }
}

/// Run `fut` under the per-request timeout.
async fn bounded<T, F>(state: &AppState, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = crate::error::Result<T>>,
{
    match tokio::time::timeout(state.request_timeout, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ResolveError::upstream(None, "request timed out").into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoParams {
    url: Option<String>,
    quality: Option<String>,
}

/// `GET /search?q=&limit=`
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let query = required(params.q, "q")?;
    let limit = parse_limit(params.limit.as_deref())?;

    let tracks = bounded(&state, state.soundcloud.search(&query, limit)).await?;
    Ok(Json(json!({ "tracks": tracks })))
}

/// `GET /resolve?url=`
pub async fn resolve(
    State(state): State<AppState>,
    params: Result<Query<UrlParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let url = required(params.url, "url")?;
    let track = bounded(&state, state.soundcloud.resolve(&url)).await?;
    Ok(Json(json!({ "track": track })))
}

/// `GET /stream?url=`
pub async fn stream(
    State(state): State<AppState>,
    params: Result<Query<UrlParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let url = required(params.url, "url")?;
    let resolved = bounded(&state, state.soundcloud.stream(&url)).await?;
    Ok(Json(json!(resolved)))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /youtube/info?url=`
pub async fn youtube_info(
    State(state): State<AppState>,
    params: Result<Query<UrlParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let url = required(params.url, "url")?;
    let info = bounded(&state, state.youtube.info(&url)).await?;
    Ok(Json(json!({
        "success": true,
        "id": info.id,
        "title": info.title,
        "duration": info.duration_secs,
        "thumbnail": info.thumbnail,
        "channel": info.channel,
        "formats": info.formats,
    })))
}

/// `GET /youtube/video?url=&quality=`
pub async fn youtube_video(
    State(state): State<AppState>,
    params: Result<Query<VideoParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let url = required(params.url, "url")?;
    let quality: StreamQuality = params.quality.as_deref().unwrap_or("highest").parse()?;

    let chosen = bounded(&state, state.youtube.video(&url, quality)).await?;
    Ok(Json(json!({
        "success": true,
        "title": chosen.title,
        "url": chosen.url(),
        "quality": chosen.variant.quality_label,
        "container": chosen.variant.container,
    })))
}

/// `GET /youtube/audio?url=`
pub async fn youtube_audio(
    State(state): State<AppState>,
    params: Result<Query<UrlParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let url = required(params.url, "url")?;
    let chosen = bounded(&state, state.youtube.audio(&url)).await?;
    Ok(Json(json!({
        "success": true,
        "title": chosen.title,
        "url": chosen.url(),
        "container": chosen.variant.container,
        "audioBitrate": chosen.variant.bitrate.map(|b| b / 1000),
    })))
}

/// Anything unrouted.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "endpoints": ENDPOINTS })),
    )
}
