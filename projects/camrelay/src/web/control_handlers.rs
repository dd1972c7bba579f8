use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    app_state::ControlState,
    control::CameraBinding,
    core::errors::AppError,
    v4l2::{Control, ControlError, ControlValues},
};

use super::pages;

#[derive(Debug, Default, Deserialize)]
pub struct CamQuery {
    cam: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ControlsResponse {
    controls: Vec<Control>,
}

#[derive(Serialize)]
pub struct SetResponse {
    ok: bool,
    applied: ControlValues,
}

#[derive(Serialize)]
pub struct InfoResponse {
    info: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn panel(State(state): State<Arc<ControlState>>) -> Result<Html<String>, AppError> {
    if state.service.cameras().is_empty() {
        return Err(AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ControlError::NoDevices.to_string(),
        ));
    }
    Ok(Html(pages::control_panel(&state.title, &state.stream_url_base)))
}

pub async fn cameras(State(state): State<Arc<ControlState>>) -> Json<Vec<CameraBinding>> {
    Json(state.service.cameras().iter().cloned().collect())
}

pub async fn list_controls(
    State(state): State<Arc<ControlState>>,
    Query(query): Query<CamQuery>,
) -> Result<Json<ControlsResponse>, AppError> {
    let controls = state
        .service
        .list(query.cam.as_deref())
        .await
        .inspect_err(|err| log_failure("list controls", err))?;
    Ok(Json(ControlsResponse { controls }))
}

pub async fn set_controls(
    State(state): State<Arc<ControlState>>,
    Query(query): Query<CamQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SetResponse>, AppError> {
    let changes: Map<String, Value> = match payload {
        Ok(Json(Value::Object(changes))) => changes,
        Ok(Json(_)) | Err(_) => {
            return Err(AppError::api(StatusCode::BAD_REQUEST, "Invalid JSON body"));
        }
    };

    let applied = state
        .service
        .set(query.cam.as_deref(), &changes)
        .await
        .inspect_err(|err| log_failure("set controls", err))?;
    info!("controls set via http: {applied:?}");
    Ok(Json(SetResponse { ok: true, applied }))
}

pub async fn device_info(
    State(state): State<Arc<ControlState>>,
    Query(query): Query<CamQuery>,
) -> Result<Json<InfoResponse>, AppError> {
    let info = state
        .service
        .info(query.cam.as_deref())
        .await
        .inspect_err(|err| log_failure("fetch device info", err))?;
    Ok(Json(InfoResponse { info }))
}

pub async fn not_found() -> AppError {
    AppError::api(StatusCode::NOT_FOUND, "Not Found")
}

fn log_failure(action: &str, err: &ControlError) {
    match err {
        ControlError::CommandFailed(_) | ControlError::Internal(_) => {
            warn!("failed to {action}: {err:#}")
        }
        _ => {}
    }
}
