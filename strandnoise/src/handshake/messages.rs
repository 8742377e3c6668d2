// Handshake messages exchanged before the key split.
//
//   Initiator                                   Responder
//     |--- ClientHello { e } ------------------->|
//     |<-- HandshakeMessage { e, enc(s), enc(cert) }
//     |--- ClientFinish { enc(e'), enc(payload) }>|
//     |======== split: transport frames =========|
//
// Variable-length fields carry a u16 big-endian length prefix.

use crate::error::{NoiseError, Result};

/// Message 1: Initiator -> Responder. Sent in cleartext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// The initiator's hello key (the key bound into its transcript at init).
    pub ephemeral: [u8; 32],
}

impl ClientHello {
    pub const ENCODED_LEN: usize = 32;

    pub fn encode(&self) -> Vec<u8> {
        self.ephemeral.to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let ephemeral: [u8; 32] = data.try_into().map_err(|_| {
            NoiseError::MalformedMessage(format!(
                "client hello must be {} bytes, got {}",
                Self::ENCODED_LEN,
                data.len()
            ))
        })?;
        Ok(Self { ephemeral })
    }
}

/// Message 2: Responder -> Initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    /// Responder ephemeral public key, cleartext.
    pub ephemeral: [u8; 32],
    /// Responder static public key, encrypted.
    pub static_encrypted: Vec<u8>,
    /// Serialized certificate over the static key, encrypted.
    pub payload_encrypted: Vec<u8>,
}

impl HandshakeMessage {
    /// `[ephemeral:32][static_len:2][static][payload_len:2][payload]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(
            32 + 4 + self.static_encrypted.len() + self.payload_encrypted.len(),
        );
        buf.extend_from_slice(&self.ephemeral);
        put_field(&mut buf, &self.static_encrypted, "static")?;
        put_field(&mut buf, &self.payload_encrypted, "payload")?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let ephemeral = reader.array()?;
        let static_encrypted = reader.field()?;
        let payload_encrypted = reader.field()?;
        reader.finish()?;
        Ok(Self {
            ephemeral,
            static_encrypted,
            payload_encrypted,
        })
    }
}

/// Message 3: Initiator -> Responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFinish {
    /// The initiator's handshake key pair public half, encrypted.
    pub static_encrypted: Vec<u8>,
    /// Application login payload, encrypted (possibly an empty plaintext).
    pub payload_encrypted: Vec<u8>,
}

impl ClientFinish {
    /// `[static_len:2][static][payload_len:2][payload]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf =
            Vec::with_capacity(4 + self.static_encrypted.len() + self.payload_encrypted.len());
        put_field(&mut buf, &self.static_encrypted, "static")?;
        put_field(&mut buf, &self.payload_encrypted, "payload")?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let static_encrypted = reader.field()?;
        let payload_encrypted = reader.field()?;
        reader.finish()?;
        Ok(Self {
            static_encrypted,
            payload_encrypted,
        })
    }
}

fn put_field(buf: &mut Vec<u8>, field: &[u8], name: &str) -> Result<()> {
    let len = u16::try_from(field.len()).map_err(|_| {
        NoiseError::MalformedMessage(format!("{name} field is {} bytes", field.len()))
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(field);
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(NoiseError::MalformedMessage(format!(
                "need {n} bytes at offset {}, have {}",
                self.pos,
                self.data.len() - self.pos
            )));
        }
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array(&mut self) -> Result<[u8; 32]> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn field(&mut self) -> Result<Vec<u8>> {
        let len = self.take(2)?;
        let len = u16::from_be_bytes([len[0], len[1]]) as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.data.len() {
            return Err(NoiseError::MalformedMessage(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
