// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport framing
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: payload]
//! ```
//!
//! A zero-length frame is a heartbeat and carries nothing.

use crate::error::FrameError;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest frame a receiver accepts by default
pub const DEFAULT_MAX_FRAME: u32 = 16 * 1024 * 1024;

/// Turns one payload into the bytes written for it
pub trait Framing: Send + Sync {
    fn frame(&self, payload: &[u8], out: &mut Vec<u8>);
}

/// `[len u32 BE][payload]`
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixed;

impl Framing for LengthPrefixed {
    fn frame(&self, payload: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
    }
}

/// Read one length-prefixed frame
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary.
/// Heartbeats are returned as empty payloads.
pub async fn read_frame<R>(reader: &mut R, max_len: u32) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        filled += n;
    }

    let len = u32::from_be_bytes(prefix);
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len as usize];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(FrameError::Truncated),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
