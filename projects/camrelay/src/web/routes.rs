use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::app_state::{ControlState, StreamState};

use super::{control_handlers, stream_handlers};

pub fn build_stream_router(state: Arc<StreamState>) -> Router {
    Router::new()
        .route("/", get(stream_handlers::index))
        .route("/player", get(stream_handlers::player))
        .route("/snapshot.jpg", get(stream_handlers::snapshot))
        .route("/stream.mjpg", get(stream_handlers::mjpeg))
        .route("/stream.h264", get(stream_handlers::h264))
        .fallback(stream_handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_control_router(state: Arc<ControlState>) -> Router {
    Router::new()
        .route("/", get(control_handlers::panel))
        .route("/control", get(control_handlers::panel))
        .route("/healthz", get(control_handlers::health))
        .route("/api/cams", get(control_handlers::cameras))
        .route("/api/v4l2/ctrls", get(control_handlers::list_controls))
        .route("/api/v4l2/set", post(control_handlers::set_controls))
        .route("/api/v4l2/info", get(control_handlers::device_info))
        .fallback(control_handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
