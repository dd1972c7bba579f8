use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Response},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::{
    app_state::StreamState,
    core::errors::AppError,
    stream::{LIVE_CACHE_CONTROL, MediaKind, SocketReader, relay},
};

use super::pages;

const BODY_CHANNEL_CAPACITY: usize = 8;

pub async fn index() -> Html<&'static str> {
    Html(pages::STREAM_INDEX)
}

pub async fn player() -> Html<&'static str> {
    Html(pages::PLAYER)
}

pub async fn snapshot(State(state): State<Arc<StreamState>>) -> Result<Response, AppError> {
    open_relay(&state, MediaKind::Snapshot).await
}

pub async fn mjpeg(State(state): State<Arc<StreamState>>) -> Result<Response, AppError> {
    open_relay(&state, MediaKind::Mjpeg).await
}

pub async fn h264(State(state): State<Arc<StreamState>>) -> Result<Response, AppError> {
    open_relay(&state, MediaKind::H264).await
}

pub async fn not_found() -> AppError {
    AppError::not_found()
}

/// Connects the upstream socket before any header goes out, so an
/// unreachable source is still a 503. The relay then runs on its own task.
async fn open_relay(state: &StreamState, kind: MediaKind) -> Result<Response, AppError> {
    let unavailable = || AppError::new(StatusCode::SERVICE_UNAVAILABLE, kind.unavailable_message());

    let Some(path) = state.config.socket_for(kind) else {
        warn!("{} requested but no socket is configured", kind.label());
        return Err(unavailable());
    };
    let reader = SocketReader::connect(path, state.config.chunk_size)
        .await
        .map_err(|err| {
            warn!("{} upstream unavailable: {err}", kind.label());
            unavailable()
        })?;

    let (tx, rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
    tokio::spawn(relay(kind, reader, tx));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(LIVE_CACHE_CONTROL));

    Ok((
        StatusCode::OK,
        headers,
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}
