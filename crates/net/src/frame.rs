//! Wire framing
//!
//! Every frame is a big-endian `u32` byte count followed by that many
//! bytes of JSON. Counts of zero or above `FRAME_LIMIT` are refused before
//! any payload is read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Largest payload either side accepts, in bytes
const FRAME_LIMIT: usize = 1 << 20;

fn closed_or_io(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
        _ => Error::Io(e),
    }
}

fn check_size(size: usize) -> Result<()> {
    match size {
        0 => Err(Error::Protocol("Zero-length frame".into())),
        n if n > FRAME_LIMIT => Err(Error::Protocol(format!(
            "Frame of {} bytes exceeds the {} byte limit",
            n, FRAME_LIMIT
        ))),
        _ => Ok(()),
    }
}

/// Read one frame and decode its JSON body as `T`
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let size = reader.read_u32().await.map_err(closed_or_io)? as usize;
    check_size(size)?;

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await.map_err(closed_or_io)?;

    serde_json::from_slice(&body).map_err(|e| Error::Protocol(format!("Undecodable frame: {}", e)))
}

/// Encode `frame` as JSON and write it with its byte count
pub async fn write_frame<T, W>(writer: &mut W, frame: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(frame)
        .map_err(|e| Error::Protocol(format!("Unencodable frame: {}", e)))?;
    check_size(body.len())?;

    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
