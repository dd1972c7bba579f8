use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::{io::AsyncReadExt, net::UnixStream};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upstream could not be reached at all. Distinct from a mid-stream read failure,
/// which surfaces as an `io::Error` from [`ChunkSource::next_chunk`].
#[derive(Debug, Error)]
#[error("failed to connect to {}: {source}", path.display())]
pub struct ConnectError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A finite, ordered sequence of raw byte chunks.
///
/// `Ok(None)` marks a clean end of stream; after that, or after an error,
/// the source must not be polled again.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// Reads chunks from a local stream socket. The connection is closed when the
/// reader is dropped, whichever way consumption ends.
#[derive(Debug)]
pub struct SocketReader {
    stream: UnixStream,
    buffer: Vec<u8>,
    finished: bool,
}

impl SocketReader {
    pub async fn connect(path: &Path, chunk_size: usize) -> Result<Self, ConnectError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| ConnectError {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::from_stream(stream, chunk_size))
    }

    pub fn from_stream(stream: UnixStream, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            stream,
            buffer: vec![0_u8; chunk_size],
            finished: false,
        }
    }
}

#[async_trait]
impl ChunkSource for SocketReader {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        match self.stream.read(&mut self.buffer).await {
            Ok(0) => {
                self.finished = true;
                Ok(None)
            }
            Ok(n) => Ok(Some(Bytes::copy_from_slice(&self.buffer[..n]))),
            Err(err) => {
                self.finished = true;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use tokio::{io::AsyncWriteExt, net::UnixListener};

    use super::{ChunkSource, SocketReader};

    fn temp_socket_path(tag: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("camrelay-{tag}-{suffix}.sock"))
    }

    #[tokio::test]
    async fn connect_fails_for_missing_socket() {
        let path = temp_socket_path("missing");
        let err = SocketReader::connect(&path, 1024)
            .await
            .expect_err("connect should fail");
        assert_eq!(err.path, path);
    }

    #[tokio::test]
    async fn yields_chunks_until_peer_closes() {
        let path = temp_socket_path("reader");
        let listener = UnixListener::bind(&path).expect("should bind test socket");

        let writer = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.expect("should accept");
            conn.write_all(b"hello ").await.expect("should write");
            conn.write_all(b"world").await.expect("should write");
        });

        let mut reader = SocketReader::connect(&path, 4)
            .await
            .expect("should connect");
        let mut received = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.expect("read should succeed") {
            assert!(chunk.len() <= 4, "chunk exceeds configured size");
            received.extend_from_slice(&chunk);
        }
        writer.await.expect("writer task should finish");

        assert_eq!(received, b"hello world");
        assert!(reader.next_chunk().await.expect("read after eof").is_none());
        let _ = std::fs::remove_file(path);
    }
}
