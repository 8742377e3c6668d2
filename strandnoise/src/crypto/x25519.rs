// X25519 key pairs for the handshake key mixes.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{NoiseError, Result};

/// An X25519 key pair: either a long-lived static key or the ephemeral key of
/// a single handshake. Secrets are zeroized on drop.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Rebuild a stored static key.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(StaticSecret::from(bytes))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// `DH(self.secret, peer)`. A low-order peer key yields an all-zero,
    /// non-contributory secret and is rejected.
    pub fn diffie_hellman(&self, peer_public: &[u8; 32]) -> Result<[u8; 32]> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(NoiseError::InvalidKey(
                "peer public key has low order".into(),
            ));
        }
        Ok(shared.to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", self.public.as_bytes())
            .finish_non_exhaustive()
    }
}
