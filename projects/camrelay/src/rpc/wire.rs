use std::io;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;
const READ_CHUNK_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("message exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads one newline-terminated message. A peer that closes without a newline
/// still delivers what it sent. `None` means the peer closed before sending
/// a single byte; a bare newline yields an empty message.
pub async fn read_message<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    let mut received = false;
    let mut chunk = [0_u8; READ_CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(received.then_some(data));
        }
        received = true;

        if let Some(newline) = chunk[..n].iter().position(|b| *b == b'\n') {
            data.extend_from_slice(&chunk[..newline]);
            if data.len() > limit {
                return Err(WireError::TooLarge { limit });
            }
            return Ok(Some(data));
        }

        data.extend_from_slice(&chunk[..n]);
        if data.len() > limit {
            return Err(WireError::TooLarge { limit });
        }
    }
}

/// Writes `message` as a single JSON line.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message).map_err(io::Error::from)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
