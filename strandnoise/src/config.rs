// Handshake configuration shared by the initiator and responder roles.

use serde::{Deserialize, Serialize};

use crate::crypto::aead::CipherSuite;
use crate::error::{NoiseError, Result};

/// Connection preamble sent ahead of the initiator's first frame.
///
/// `[b'S', b'N', major, minor]`; the version bytes are folded into the
/// transcript hash so that mismatched peers fail the handshake.
pub const DEFAULT_PREAMBLE: [u8; 4] = [b'S', b'N', 0x01, 0x00];

/// Upper bound on the preamble length accepted from configuration.
pub const MAX_PREAMBLE_LEN: usize = 64;

/// Parameters both peers must agree on for a handshake to succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Protocol identity string. Used verbatim as the initial transcript hash
    /// when exactly 32 bytes long, hashed with SHA-256 otherwise.
    pub protocol_name: String,
    /// One-time wire preamble. Also authenticated into the transcript.
    pub preamble: Vec<u8>,
    /// AEAD used for both the handshake and transport phases.
    pub cipher_suite: CipherSuite,
    /// Ed25519 issuer keys accepted on peer certificates. Empty accepts any
    /// issuer whose signature verifies.
    pub trusted_issuers: Vec<[u8; 32]>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self::with_suite(CipherSuite::default())
    }
}

impl NoiseConfig {
    /// Configuration for `suite` using its canonical protocol name.
    pub fn with_suite(suite: CipherSuite) -> Self {
        Self {
            protocol_name: suite.protocol_name().to_string(),
            preamble: DEFAULT_PREAMBLE.to_vec(),
            cipher_suite: suite,
            trusted_issuers: Vec::new(),
        }
    }

    /// Pin an additional certificate issuer.
    pub fn trust_issuer(mut self, issuer_public_key: [u8; 32]) -> Self {
        self.trusted_issuers.push(issuer_public_key);
        self
    }

    /// Replace the wire preamble.
    pub fn preamble(mut self, preamble: impl Into<Vec<u8>>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.protocol_name.is_empty() {
            return Err(NoiseError::Config("protocol_name must not be empty".into()));
        }
        if self.preamble.len() > MAX_PREAMBLE_LEN {
            return Err(NoiseError::Config(format!(
                "preamble is {} bytes, maximum is {MAX_PREAMBLE_LEN}",
                self.preamble.len()
            )));
        }
        Ok(())
    }
}
