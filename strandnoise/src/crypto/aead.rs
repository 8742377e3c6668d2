// AEAD cipher suites: AES-256-GCM (default) and ChaCha20-Poly1305 (RFC 8439).
//
// Both suites take a 32-byte key and a 12-byte nonce and append a 16-byte
// tag. Channel nonces are `[0u8; 8] || counter.to_be_bytes()`.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{NoiseError, Result};

/// Length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Length of an AEAD nonce.
pub const NONCE_LEN: usize = 12;

/// Cipher suite used for every encrypt/decrypt on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CipherSuite {
    /// AES-256-GCM.
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// ChaCha20-Poly1305.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Canonical protocol identity for this suite, padded to 32 bytes so it
    /// seeds the transcript hash directly.
    pub fn protocol_name(self) -> &'static str {
        match self {
            CipherSuite::Aes256Gcm => "Noise_XX_25519_AESGCM_SHA256\0\0\0\0",
            CipherSuite::ChaCha20Poly1305 => "Noise_XX_25519_ChaChaPoly_SHA256",
        }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CipherSuite::Aes256Gcm => "aes-256-gcm",
            CipherSuite::ChaCha20Poly1305 => "chacha20-poly1305",
        })
    }
}

/// Build the 12-byte nonce for `counter`: eight zero bytes followed by the
/// counter in big-endian order.
pub fn counter_nonce(counter: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[8..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// A 32-byte key bound to one cipher suite.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AeadKey {
    #[zeroize(skip)]
    suite: CipherSuite,
    key: [u8; 32],
}

impl AeadKey {
    pub fn new(suite: CipherSuite, key: [u8; 32]) -> Self {
        Self { suite, key }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Returns `ciphertext || tag`.
    pub fn encrypt(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg: plaintext, aad };
        let nonce = Nonce::from_slice(nonce);
        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        match self.suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new(key).encrypt(nonce, payload),
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new(key).encrypt(nonce, payload),
        }
        .map_err(|e| NoiseError::Encryption(format!("{}: {e}", self.suite)))
    }

    /// Opens `ciphertext || tag`. Inputs shorter than the tag are rejected
    /// without touching the cipher.
    pub fn decrypt(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LEN {
            return Err(NoiseError::Decryption(format!(
                "ciphertext is {} bytes, shorter than the {TAG_LEN}-byte tag",
                ciphertext.len()
            )));
        }
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        let nonce = Nonce::from_slice(nonce);
        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        match self.suite {
            CipherSuite::Aes256Gcm => Aes256Gcm::new(key).decrypt(nonce, payload),
            CipherSuite::ChaCha20Poly1305 => ChaCha20Poly1305::new(key).decrypt(nonce, payload),
        }
        .map_err(|e| NoiseError::Decryption(format!("{}: {e}", self.suite)))
    }
}
