//! Length-prefixed framing of archive messages.

use creepline_archive::{from_bytes, to_bytes, Archive};

use crate::NetError;

/// Size of the little-endian `u32` length that precedes every frame body.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest frame body accepted in either direction.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Encodes `message` as a length prefix followed by its archive bytes.
pub fn encode_frame<A: Archive>(message: &A) -> Result<Vec<u8>, NetError> {
    let body = to_bytes(message);
    if body.len() > MAX_FRAME_LEN {
        return Err(NetError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reassembles frames from a byte stream that may split them arbitrarily.
#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates a decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed by a frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Decodes the next complete frame, if one is buffered.
    ///
    /// An oversized length prefix fails before the body arrives. A failed
    /// decode leaves the stream unusable; callers drop the connection.
    pub fn next_frame<A: Archive>(&mut self) -> Result<Option<A>, NetError> {
        let Some(header) = self.buffer.get(..FRAME_HEADER_LEN) else {
            return Ok(None);
        };
        let mut prefix = [0; FRAME_HEADER_LEN];
        prefix.copy_from_slice(header);
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(NetError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }

        let end = FRAME_HEADER_LEN + len;
        let Some(body) = self.buffer.get(FRAME_HEADER_LEN..end) else {
            return Ok(None);
        };
        let message = from_bytes(body)?;
        let _ = self.buffer.drain(..end);
        Ok(Some(message))
    }
}
