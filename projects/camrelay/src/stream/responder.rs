use std::io;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{ChunkSource, MediaKind, h264::H264Relay, jpeg::JpegFrameExtractor};

const MJPEG_PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const MJPEG_LOG_EVERY_FRAMES: u64 = 30;

pub type BodySender = mpsc::Sender<io::Result<Bytes>>;

/// How a relay ended. Headers are already out by the time a relay runs, so
/// none of these change the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream reached a clean end of stream.
    Done,
    /// The HTTP client went away; nothing more is written.
    ClientGone,
    /// Reading the upstream failed mid-stream.
    UpstreamError,
}

enum Framing {
    Passthrough,
    Mjpeg(JpegFrameExtractor),
    H264(H264Relay),
}

struct ClientGone;

/// Pumps `source` into `body` framed for `kind` until one side ends.
///
/// Every body message is one write: a raw chunk, or one complete multipart
/// part per JPEG frame. The upstream connection is released when this returns.
pub async fn relay<S: ChunkSource>(kind: MediaKind, mut source: S, body: BodySender) -> RelayOutcome {
    let mut framing = match kind {
        MediaKind::Snapshot => Framing::Passthrough,
        MediaKind::Mjpeg => Framing::Mjpeg(JpegFrameExtractor::new()),
        MediaKind::H264 => Framing::H264(H264Relay::new()),
    };
    let mut bytes_sent: u64 = 0;
    let mut frames_sent: u64 = 0;

    loop {
        let read = tokio::select! {
            biased;
            _ = body.closed() => None,
            read = source.next_chunk() => Some(read),
        };

        let chunk = match read {
            None => {
                info!(
                    "{} client disconnected after {bytes_sent} bytes",
                    kind.label()
                );
                return RelayOutcome::ClientGone;
            }
            Some(Ok(Some(chunk))) => chunk,
            Some(Ok(None)) => {
                info!(
                    "{} socket EOF, sent {bytes_sent} bytes ({frames_sent} frames)",
                    kind.label()
                );
                return RelayOutcome::Done;
            }
            Some(Err(err)) => {
                warn!("{} stream error: {err}", kind.label());
                let _ = body.send(Err(err)).await;
                return RelayOutcome::UpstreamError;
            }
        };

        let delivered = match &mut framing {
            Framing::Passthrough => {
                bytes_sent += chunk.len() as u64;
                deliver(&body, chunk).await
            }
            Framing::H264(h264) => {
                h264.record(chunk.len());
                bytes_sent += chunk.len() as u64;
                deliver(&body, chunk).await
            }
            Framing::Mjpeg(extractor) => {
                let mut delivered = Ok(());
                for frame in extractor.push_chunk(&chunk) {
                    let part = mjpeg_part(&frame);
                    bytes_sent += part.len() as u64;
                    delivered = deliver(&body, part).await;
                    if delivered.is_err() {
                        break;
                    }
                    frames_sent += 1;
                    if frames_sent % MJPEG_LOG_EVERY_FRAMES == 0 {
                        debug!("MJPEG sent {frames_sent} frames");
                    }
                }
                delivered
            }
        };

        if delivered.is_err() {
            info!(
                "{} client disconnected after {bytes_sent} bytes",
                kind.label()
            );
            return RelayOutcome::ClientGone;
        }
    }
}

async fn deliver(body: &BodySender, bytes: Bytes) -> Result<(), ClientGone> {
    body.send(Ok(bytes)).await.map_err(|_| ClientGone)
}

fn mjpeg_part(frame: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(MJPEG_PART_HEADER.len() + frame.len() + 2);
    part.extend_from_slice(MJPEG_PART_HEADER);
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}
