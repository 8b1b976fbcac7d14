//! Backend message framing.
//!
//! Bytes arrive from the transport in arbitrary chunks, [`FrameDecoder`]
//! buffers them and split off complete [`Frame`]s from the front.
use bytes::{Buf, Bytes, BytesMut};

use crate::postgres::{BackendMessage, ProtocolError};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Upper bound of capacity reserved ahead for a partially received frame.
const MAX_RESERVE: usize = 64 * 1024;

/// msgtype + length
const HEADER: usize = 1 + 4;

/// One complete backend message, without its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type.
    pub msgtype: u8,
    /// Message body, its length is the declared length minus 4.
    pub body: Bytes,
}

/// Receive buffer which yields complete backend [`Frame`]s.
///
/// Extracted frames are split off the front of a single [`BytesMut`] arena,
/// no bytes are copied when a frame is released.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY) }
    }

    /// Append `bytes`, then extract every complete frame.
    ///
    /// On error, frames extracted before the violation are discarded, the
    /// stream is no longer aligned and must be closed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Frame>, ProtocolError> {
        self.extend(bytes);
        let mut frames = vec![];
        while let Some(frame) = self.try_extract_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Append `bytes` without extracting.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Try to split one complete frame off the front of the buffer.
    ///
    /// Returns `Ok(None)` without consuming anything if the header or the
    /// body is not yet fully buffered.
    pub fn try_extract_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        let Some(mut header) = self.buf.get(..HEADER) else {
            return Ok(None);
        };

        let msgtype = header.get_u8();
        let len = header.get_u32();

        if !BackendMessage::is_known(msgtype) {
            return Err(ProtocolError::unknown(msgtype));
        }

        // length includes itself
        let Some(body_len) = len.checked_sub(4) else {
            return Err(ProtocolError::invalid_length(msgtype, len));
        };
        let body_len = body_len as usize;

        let available = self.buf.len() - HEADER;
        if available < body_len {
            self.buf.reserve((body_len - available).min(MAX_RESERVE));
            return Ok(None);
        }

        self.buf.advance(HEADER);
        let body = self.buf.split_to(body_len).freeze();

        Ok(Some(Frame { msgtype, body }))
    }

    /// Number of buffered bytes not yet extracted.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// The underlying arena, for reading from io directly into spare capacity.
    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
