// Framer: frame encoding and decoding bound to one symmetric state.
//
//   outbound: payload -> [encrypt if finished] -> [preamble once] len body
//   inbound:  chunks -> FrameDecoder -> body -> [decrypt + codec if finished]
//
// The framer is the only owner of the state once a connection is built, so
// the handshake drivers reach it through `state_mut`.

use bytes::Bytes;
use strandnoise::crypto::aead::TAG_LEN;
use strandnoise::{NoiseError, Role, SymmetricState};
use tracing::{trace, warn};

use crate::codec::MessageCodec;
use crate::config::WireConfig;
use crate::error::{Result, WireError};
use crate::frame::{self, FrameDecoder};

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<M> {
    /// Raw body received before the key split.
    Handshake(Bytes),
    /// Decrypted and decoded transport message.
    Message(M),
}

pub struct Framer<C: MessageCodec> {
    state: SymmetricState,
    codec: C,
    preamble: Vec<u8>,
    sent_intro: bool,
    decoder: FrameDecoder,
    max_frame_len: usize,
}

impl<C: MessageCodec> Framer<C> {
    /// The initiator emits the preamble ahead of its first frame; the
    /// responder expects it ahead of the first inbound frame instead.
    pub fn new(state: SymmetricState, codec: C, config: &WireConfig) -> Self {
        let preamble = config.noise.preamble.clone();
        let max_frame_len = config.max_frame_len.min(frame::MAX_FRAME_LEN);
        let (sent_intro, decoder) = match state.role() {
            Role::Initiator => (false, FrameDecoder::new(max_frame_len)),
            Role::Responder => (true, FrameDecoder::expecting_preamble(&preamble, max_frame_len)),
        };
        Self {
            state,
            codec,
            preamble,
            sent_intro,
            decoder,
            max_frame_len,
        }
    }

    pub fn state(&self) -> &SymmetricState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SymmetricState {
        &mut self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Bytes received but not yet consumed as frames.
    pub fn buffered(&self) -> usize {
        self.decoder.buffered()
    }

    /// Build one outbound frame. After the split `payload` is encrypted first.
    pub fn encode(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.ensure_usable()?;

        let finished = self.state.is_finished();
        let body_len = payload.len() + if finished { TAG_LEN } else { 0 };
        if body_len > self.max_frame_len {
            return Err(WireError::PayloadTooLarge {
                size: body_len,
                max: self.max_frame_len,
            });
        }

        let encrypted;
        let body = if finished {
            encrypted = self.state.encrypt(payload)?;
            &encrypted[..]
        } else {
            payload
        };

        let preamble = (!self.sent_intro).then_some(&self.preamble[..]);
        let out = frame::encode(preamble, body, self.max_frame_len)?;
        self.sent_intro = true;
        trace!(len = body.len(), finished, "frame encoded");
        Ok(out)
    }

    /// Buffer bytes read from the transport without dispatching anything.
    pub fn push(&mut self, chunk: &[u8]) {
        self.decoder.extend(chunk);
    }

    /// Decode at most one buffered frame.
    ///
    /// Framing and integrity failures poison the state. A codec failure
    /// consumes the frame but leaves the connection usable.
    pub fn decode_one(&mut self) -> Result<Option<Inbound<C::Message>>> {
        self.ensure_usable()?;

        let body = match self.decoder.next_frame() {
            Ok(Some(body)) => body,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "inbound framing error");
                self.state.poison();
                return Err(e);
            }
        };

        if !self.state.is_finished() {
            trace!(len = body.len(), "handshake frame decoded");
            return Ok(Some(Inbound::Handshake(body)));
        }

        let plaintext = self.state.decrypt(&body)?;
        let message = self.codec.decode(&plaintext)?;
        trace!(len = body.len(), "transport frame decoded");
        Ok(Some(Inbound::Message(message)))
    }

    /// Buffer `chunk` and dispatch every complete frame to `on_frame`.
    /// Returns how many frames were dispatched.
    ///
    /// A codec failure does not stop the drain: the remaining frames are
    /// still dispatched and the first codec error is returned afterwards.
    /// Fatal errors return immediately.
    ///
    /// Frames coalesced behind the last handshake frame are dispatched raw;
    /// callers that split keys mid-stream use `push` and `decode_one`.
    pub fn decode(
        &mut self,
        chunk: &[u8],
        mut on_frame: impl FnMut(Inbound<C::Message>),
    ) -> Result<usize> {
        self.push(chunk);
        let mut dispatched = 0;
        let mut codec_error = None;
        loop {
            match self.decode_one() {
                Ok(Some(inbound)) => {
                    on_frame(inbound);
                    dispatched += 1;
                }
                Ok(None) => break,
                Err(e @ WireError::Codec(_)) => {
                    codec_error.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        match codec_error {
            Some(e) => Err(e),
            None => Ok(dispatched),
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state.is_poisoned() {
            return Err(WireError::Noise(NoiseError::Poisoned));
        }
        Ok(())
    }
}

impl<C: MessageCodec> std::fmt::Debug for Framer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framer")
            .field("state", &self.state)
            .field("sent_intro", &self.sent_intro)
            .field("buffered", &self.decoder.buffered())
            .field("max_frame_len", &self.max_frame_len)
            .finish_non_exhaustive()
    }
}
