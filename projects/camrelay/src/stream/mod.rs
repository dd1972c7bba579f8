//! Upstream socket relays: raw chunk reading, JPEG re-framing, H264
//! passthrough, and the per-request responder that feeds an HTTP body.

pub mod h264;
pub mod jpeg;
pub mod reader;
pub mod responder;

pub use reader::{ChunkSource, ConnectError, SocketReader};
pub use responder::{RelayOutcome, relay};

pub const LIVE_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Snapshot,
    Mjpeg,
    H264,
}

impl MediaKind {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Snapshot => "image/jpeg",
            Self::Mjpeg => "multipart/x-mixed-replace; boundary=frame",
            Self::H264 => "video/h264",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Snapshot => "JPEG",
            Self::Mjpeg => "MJPEG",
            Self::H264 => "H264",
        }
    }

    pub fn unavailable_message(self) -> &'static str {
        match self {
            Self::Snapshot => "Snapshot not available",
            Self::Mjpeg => "MJPEG stream not available",
            Self::H264 => "H264 stream not available",
        }
    }
}
