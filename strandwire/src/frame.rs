use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Size of the frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 3;

/// Largest body a 3-byte length prefix can describe.
pub const MAX_FRAME_LEN: usize = (1 << 24) - 1;

/// Wire frame.
///
/// Binary layout:
///
/// ```text
/// +-----------+---------------+--- variable ---+
/// | len >> 16 | len & 0xFFFF  |     body       |
/// |   (1B)    |   (2B, BE)    |   (len bytes)  |
/// +-----------+---------------+----------------+
/// ```
///
/// The initiator's first frame is preceded by the connection preamble.
pub fn encode_into(buf: &mut BytesMut, preamble: Option<&[u8]>, body: &[u8], max: usize) -> Result<()> {
    if body.len() > max.min(MAX_FRAME_LEN) {
        return Err(WireError::PayloadTooLarge {
            size: body.len(),
            max: max.min(MAX_FRAME_LEN),
        });
    }
    let preamble = preamble.unwrap_or_default();
    buf.reserve(preamble.len() + LENGTH_PREFIX_SIZE + body.len());
    buf.put_slice(preamble);
    buf.put_u8((body.len() >> 16) as u8);
    buf.put_u16((body.len() & 0xFFFF) as u16);
    buf.put_slice(body);
    Ok(())
}

/// Encode one frame into a fresh buffer.
pub fn encode(preamble: Option<&[u8]>, body: &[u8], max: usize) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_into(&mut buf, preamble, body, max)?;
    Ok(buf.freeze())
}

/// Read the body length from a buffer holding at least a full prefix.
fn read_length(prefix: &[u8]) -> usize {
    ((prefix[0] as usize) << 16) | ((prefix[1] as usize) << 8) | prefix[2] as usize
}

/// Reassembles frames from arbitrarily split or coalesced reads.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// Preamble still owed by the peer, if any.
    pending_preamble: Option<Vec<u8>>,
    max_frame_len: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            pending_preamble: None,
            max_frame_len: max_frame_len.min(MAX_FRAME_LEN),
        }
    }

    /// Decoder for the accepting side: `preamble` must precede the first frame.
    pub fn expecting_preamble(preamble: &[u8], max_frame_len: usize) -> Self {
        let mut decoder = Self::new(max_frame_len);
        if !preamble.is_empty() {
            decoder.pending_preamble = Some(preamble.to_vec());
        }
        decoder
    }

    /// Append newly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Remove and return the next complete frame body, if one is buffered.
    ///
    /// A preamble mismatch or an oversized length prefix is reported as soon
    /// as the offending bytes arrive.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if let Some(expected) = &self.pending_preamble {
            let seen = self.buf.len().min(expected.len());
            if self.buf[..seen] != expected[..seen] {
                return Err(WireError::BadPreamble);
            }
            if seen < expected.len() {
                return Ok(None);
            }
            self.buf.advance(expected.len());
            self.pending_preamble = None;
        }

        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }
        let len = read_length(&self.buf[..LENGTH_PREFIX_SIZE]);
        if len > self.max_frame_len {
            return Err(WireError::FrameTooLarge {
                size: len,
                max: self.max_frame_len,
            });
        }
        if self.buf.len() < LENGTH_PREFIX_SIZE + len {
            return Ok(None);
        }
        self.buf.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}
