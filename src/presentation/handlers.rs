// HTTP request handlers
use crate::application::chart_registry::SyncOutcome;
use crate::application::view_session::ViewSnapshot;
use crate::domain::dashboard::Overview;
use crate::domain::fridge::{FridgeRef, ViewMode};
use crate::domain::telemetry::TimeRange;
use crate::infrastructure::ndjson_stream::stream_from_receiver;
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct OpenViewRequest {
    pub fridge: String,
    #[serde(default)]
    pub supp: Option<String>,
    #[serde(default)]
    pub historic: bool,
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Sparkline overview of every configured fridge
pub async fn list_fridges(State(state): State<Arc<AppState>>) -> Json<Overview> {
    Json(state.dashboard_service.overview().await)
}

pub async fn open_view(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OpenViewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ViewSnapshot>)> {
    let request = payload(body)?;
    if request.fridge.trim().is_empty() {
        return Err(ApiError::BadRequest("fridge must not be empty".into()));
    }
    let supp = request.supp.filter(|s| !s.trim().is_empty());

    let session = state.view_service.open(
        FridgeRef::new(request.fridge, supp),
        ViewMode::from_historic(request.historic),
    );
    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

pub async fn get_view(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ViewSnapshot>> {
    let session = state.view_service.get(id)?;
    Ok(Json(session.snapshot()))
}

pub async fn close_view(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Value>> {
    let cancelled = state.view_service.close(id)?;
    Ok(Json(json!({ "cancelled_requests": cancelled })))
}

/// Chart commands of one view as NDJSON. The view closes with the stream.
pub async fn view_events(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let rx = state.view_service.take_attachment(id)?;
    let views = state.clone();
    Ok(stream_from_receiver(rx, move || {
        if let Ok(cancelled) = views.view_service.close(id) {
            tracing::info!(
                "Event stream of view {} ended, {} requests cancelled",
                id,
                cancelled
            );
        }
    }))
}

pub async fn mount_chart(
    Path((id, column)): Path<(u64, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.view_service.get(id)?.mount_chart(&column)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unmount_chart(
    Path((id, column)): Path<(u64, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.view_service.get(id)?.unmount_chart(&column)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The user zoomed or panned one chart
pub async fn set_extremes(
    Path((id, column)): Path<(u64, String)>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<TimeRange>, JsonRejection>,
) -> ApiResult<Json<SyncOutcome>> {
    let range = payload(body)?;
    if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
        return Err(ApiError::BadRequest(format!(
            "invalid extremes {} - {}",
            range.min, range.max
        )));
    }

    let session = state.view_service.get(id)?;
    Ok(Json(session.on_user_extremes(&column, range)?))
}
