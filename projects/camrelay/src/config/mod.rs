use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;

use crate::{
    stream::{MediaKind, reader::DEFAULT_CHUNK_SIZE},
    v4l2::{default_state_dir, runner::DEFAULT_TIMEOUT},
};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `None` logs to stderr.
    pub dir: Option<PathBuf>,
    pub level: tracing::Level,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let dir = match env::var("LOG_DIR") {
            Ok(dir) if dir.trim().is_empty() => None,
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => Some(PathBuf::from("logs")),
        };
        let level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| v.trim().parse::<tracing::Level>().ok())
            .unwrap_or(tracing::Level::INFO);

        Self { dir, level }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub bind_addr: SocketAddr,
    pub jpeg_socket: Option<PathBuf>,
    pub mjpeg_socket: Option<PathBuf>,
    pub h264_socket: Option<PathBuf>,
    pub chunk_size: usize,
}

impl StreamConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = bind_addr("STREAM_BIND_ADDR", "0.0.0.0:8080")?;
        let chunk_size = env::var("STREAM_CHUNK_SIZE")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE);

        Ok(Self {
            bind_addr,
            jpeg_socket: optional_path("JPEG_SOCK"),
            mjpeg_socket: optional_path("MJPEG_SOCK"),
            h264_socket: optional_path("H264_SOCK"),
            chunk_size,
        })
    }

    pub fn socket_for(&self, kind: MediaKind) -> Option<&PathBuf> {
        match kind {
            MediaKind::Snapshot => self.jpeg_socket.as_ref(),
            MediaKind::Mjpeg => self.mjpeg_socket.as_ref(),
            MediaKind::H264 => self.h264_socket.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub bind_addr: SocketAddr,
    /// Raw `V4L2_DEVICES` list; `None` means auto-detect.
    pub devices: Option<String>,
    pub stream_url_base: String,
    pub title: String,
    pub rpc_socket: Option<PathBuf>,
    pub state_dir: PathBuf,
    pub restore: bool,
    pub ctl_timeout: Duration,
}

impl ControlConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = bind_addr("CTRLS_BIND_ADDR", "0.0.0.0:5000")?;
        let devices = env::var("V4L2_DEVICES")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let stream_url_base = env::var("STREAM_URL_BASE").unwrap_or_default();
        let title = env::var("CTRLS_TITLE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "V4L2 Controls".to_owned());
        let state_dir = optional_path("CTRLS_STATE_DIR").unwrap_or_else(default_state_dir);
        let restore = env::var("CTRLS_RESTORE")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let ctl_timeout = env::var("V4L2_CTL_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            bind_addr,
            devices,
            stream_url_base,
            title,
            rpc_socket: optional_path("CTRLS_RPC_SOCKET"),
            state_dir,
            restore,
            ctl_timeout,
        })
    }
}

fn bind_addr(key: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_owned());
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {key}: {raw:?}"))
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
