// Ed25519 issuer keys. Only certificates are signed with them; the handshake
// itself runs entirely on X25519.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{NoiseError, Result};

/// Signing key of a certificate issuer.
pub struct IdentityKeyPair {
    signing: SigningKey,
}

impl IdentityKeyPair {
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic issuer from a 32-byte seed, for provisioning from stored
    /// key material.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// The key pinned by initiators in `trusted_issuers`.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        self.signing.sign(data).to_bytes()
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public_key_bytes())
            .finish_non_exhaustive()
    }
}

/// Strict Ed25519 verification (rejects small-order keys and non-canonical
/// signatures).
pub fn verify_signature(issuer: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> Result<()> {
    let key = VerifyingKey::from_bytes(issuer)
        .map_err(|e| NoiseError::InvalidKey(format!("issuer key: {e}")))?;
    key.verify_strict(message, &Signature::from_bytes(signature))
        .map_err(|_| NoiseError::SignatureVerification)
}
