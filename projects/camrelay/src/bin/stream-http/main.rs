use std::sync::Arc;

use camrelay::{
    app_state::StreamState,
    config::{LogConfig, StreamConfig},
    core::logging::init_logging,
    stream::MediaKind,
    web::build_stream_router,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _log_guard = init_logging("stream-http", &LogConfig::from_env())?;
    let config = StreamConfig::from_env()?;

    for kind in [MediaKind::Snapshot, MediaKind::Mjpeg, MediaKind::H264] {
        match config.socket_for(kind) {
            Some(path) => info!("{} source: {}", kind.label(), path.display()),
            None => info!("{} source not configured", kind.label()),
        }
    }

    let bind_addr = config.bind_addr;
    let app = build_stream_router(Arc::new(StreamState::new(config)));

    info!("stream-http listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
