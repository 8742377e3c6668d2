// Channel certificates: an issuer's Ed25519 attestation of a responder's
// X25519 static key. Sent encrypted as the payload of the server hello.

pub mod builder;
pub mod serializer;
pub mod validator;

use std::time::{SystemTime, UNIX_EPOCH};

/// A signed binding between a static key and an issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseCertificate {
    /// Issuer-assigned serial number.
    pub serial: u32,
    /// The subject's X25519 static public key.
    pub key: [u8; 32],
    /// The issuer's Ed25519 public key.
    pub issuer_public_key: [u8; 32],
    /// Unix timestamp (seconds): start of validity.
    pub valid_from: u64,
    /// Unix timestamp (seconds): end of validity.
    pub valid_until: u64,
    /// Ed25519 signature over `signable_bytes()`.
    pub signature: [u8; 64],
}

impl NoiseCertificate {
    /// The canonical certificate format version.
    pub const VERSION: u8 = 1;

    /// Length of the signed portion.
    pub const SIGNABLE_LEN: usize = 1 + 4 + 32 + 32 + 8 + 8;

    /// Length of a serialized certificate.
    pub const ENCODED_LEN: usize = Self::SIGNABLE_LEN + 64;

    /// Produce the byte content that is signed (everything except the signature).
    /// This MUST match the order used by the serializer.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIGNABLE_LEN);
        buf.push(Self::VERSION);
        buf.extend_from_slice(&self.serial.to_be_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.issuer_public_key);
        buf.extend_from_slice(&self.valid_from.to_be_bytes());
        buf.extend_from_slice(&self.valid_until.to_be_bytes());
        buf
    }
}

/// Current wall-clock time in unix seconds. A clock before the epoch reads as 0.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
