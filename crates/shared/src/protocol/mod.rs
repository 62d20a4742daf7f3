//! The control-channel wire format: a bare concatenation of 2-byte
//! big-endian port numbers. No framing header, no length prefix, no
//! multiplexing — see SPEC_FULL.md §4.1.

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::ControlProtocolError;

pub mod consts;

/// Reads one 2-byte big-endian port number. Returns `Ok(None)` on a clean
/// EOF before any byte of the message was read (the other side hung up
/// between messages, not mid-message); a partial read is an error.
pub async fn read_port<R>(reader: &mut R) -> Result<Option<u16>>
where
    R: AsyncReadExt + Unpin,
{
    let mut buf = [0u8; consts::PORT_MESSAGE_LENGTH];
    let mut filled = 0;
    loop {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .context("reading control channel port message")?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ControlProtocolError::new(
                None,
                format!("closed mid-message after {} of {} bytes", filled, buf.len()),
            )
            .into());
        }
        filled += n;
        if filled == buf.len() {
            return Ok(Some(u16::from_be_bytes(buf)));
        }
    }
}

/// Writes one 2-byte big-endian port number as a single `write_all` call.
pub async fn write_port<W>(writer: &mut W, port: u16) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer
        .write_all(&port.to_be_bytes())
        .await
        .context("writing control channel port message")
}
