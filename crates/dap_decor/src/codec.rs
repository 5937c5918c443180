//! Content-Length framing over async byte streams.
//!
//! Header lines end with `\r\n`, an empty line separates headers from the
//! body, and the body is exactly `Content-Length` bytes of UTF-8 JSON. Only
//! `Content-Length` is meaningful; other headers are skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::DecorError;

/// Reads one framed payload. `Ok(None)` is a clean EOF at a message
/// boundary; an EOF inside a header or body is a framing failure and kills
/// the session.
pub async fn read_payload<R>(reader: &mut R) -> Result<Option<String>, DecorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut at_boundary = true;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            if at_boundary {
                return Ok(None);
            }
            return Err(DecorError::Framing("unexpected EOF in header".to_string()));
        }
        at_boundary = false;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                let len = value.trim().parse::<usize>().map_err(|_| {
                    DecorError::Framing(format!("invalid Content-Length `{}`", value.trim()))
                })?;
                content_length = Some(len);
            }
        } else {
            return Err(DecorError::Framing(format!("invalid header line `{line}`")));
        }
    }

    let len = content_length
        .ok_or_else(|| DecorError::Framing("missing Content-Length header".to_string()))?;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| DecorError::Framing("unexpected EOF in body".to_string()))?;
    let text = String::from_utf8(buf)
        .map_err(|err| DecorError::Framing(format!("body is not UTF-8: {err}")))?;
    Ok(Some(text))
}

/// Writes one framed payload and flushes. Exclusivity per direction comes
/// from the single writer task that owns the stream.
pub async fn write_payload<W>(writer: &mut W, payload: &str) -> Result<(), DecorError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
