//! Streaming message bodies
//!
//! Copies one HTTP body from a source connection to a destination without
//! holding more than a read buffer's worth in memory. Chunked bodies are
//! relayed byte for byte; the chunk headers are only parsed to find where
//! the body ends, so the source connection can be reused afterwards.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::request::BodyKind;

/// Read size for body copies
pub const BUFFER_SIZE: usize = 8192;

/// Longest chunk-size or trailer line accepted
const MAX_LINE: usize = 4096;

#[derive(Debug)]
pub enum RelayError {
    /// The source failed or ended early.
    Read(io::Error),
    /// The destination refused the bytes.
    Write(io::Error),
    /// Chunked framing could not be followed.
    Malformed(&'static str),
}

/// Relays one body of the given framing from `src` to `dst`.
///
/// `pending` holds bytes already read from `src` past the message head; they
/// are consumed first, and anything read past the end of the body is left in
/// it. Returns the number of bytes written to `dst`.
pub async fn relay_body<R, W>(
    src: &mut R,
    pending: &mut BytesMut,
    dst: &mut W,
    kind: BodyKind,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let written = match kind {
        BodyKind::Empty => 0,
        BodyKind::Length(len) => copy_exact(src, pending, dst, len).await?,
        BodyKind::Chunked => copy_chunked(src, pending, dst).await?,
        BodyKind::UntilClose => copy_until_close(src, pending, dst).await?,
    };

    dst.flush().await.map_err(RelayError::Write)?;
    Ok(written)
}

async fn fill<R>(src: &mut R, pending: &mut BytesMut) -> Result<usize, RelayError>
where
    R: AsyncRead + Unpin,
{
    pending.reserve(BUFFER_SIZE);
    src.read_buf(pending).await.map_err(RelayError::Read)
}

async fn copy_exact<R, W>(
    src: &mut R,
    pending: &mut BytesMut,
    dst: &mut W,
    len: u64,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut remaining = len;

    while remaining > 0 {
        if pending.is_empty() && fill(src, pending).await? == 0 {
            return Err(RelayError::Read(io::ErrorKind::UnexpectedEof.into()));
        }

        let take = pending.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let chunk = pending.split_to(take);
        dst.write_all(&chunk).await.map_err(RelayError::Write)?;
        remaining -= take as u64;
    }

    Ok(len)
}

async fn read_line<R>(src: &mut R, pending: &mut BytesMut) -> Result<BytesMut, RelayError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(pos) = pending.windows(2).position(|w| w == b"\r\n") {
            return Ok(pending.split_to(pos + 2));
        }

        if pending.len() > MAX_LINE {
            return Err(RelayError::Malformed("chunk line too long"));
        }

        if fill(src, pending).await? == 0 {
            return Err(RelayError::Read(io::ErrorKind::UnexpectedEof.into()));
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, RelayError> {
    let text = std::str::from_utf8(line).map_err(|_| RelayError::Malformed("chunk size not ascii"))?;
    let size = text.trim_end_matches("\r\n");
    let size = size.split(';').next().unwrap_or("").trim();

    u64::from_str_radix(size, 16).map_err(|_| RelayError::Malformed("invalid chunk size"))
}

async fn copy_chunked<R, W>(
    src: &mut R,
    pending: &mut BytesMut,
    dst: &mut W,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    loop {
        let line = read_line(src, pending).await?;
        let size = parse_chunk_size(&line)?;
        dst.write_all(&line).await.map_err(RelayError::Write)?;
        written += line.len() as u64;

        if size == 0 {
            // Trailer section ends with an empty line.
            loop {
                let trailer = read_line(src, pending).await?;
                dst.write_all(&trailer).await.map_err(RelayError::Write)?;
                written += trailer.len() as u64;
                if &trailer[..] == b"\r\n" {
                    return Ok(written);
                }
            }
        }

        written += copy_exact(src, pending, dst, size).await?;

        let end = read_line(src, pending).await?;
        if &end[..] != b"\r\n" {
            return Err(RelayError::Malformed("chunk not terminated by CRLF"));
        }
        dst.write_all(&end).await.map_err(RelayError::Write)?;
        written += 2;
    }
}

async fn copy_until_close<R, W>(
    src: &mut R,
    pending: &mut BytesMut,
    dst: &mut W,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    loop {
        if !pending.is_empty() {
            let chunk = pending.split();
            dst.write_all(&chunk).await.map_err(RelayError::Write)?;
            written += chunk.len() as u64;
        }

        if fill(src, pending).await? == 0 {
            return Ok(written);
        }
    }
}
