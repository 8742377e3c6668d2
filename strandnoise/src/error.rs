// StrandNoise error types

use thiserror::Error;

/// Top-level error type for the StrandNoise crate.
#[derive(Debug, Error)]
pub enum NoiseError {
    // ── Crypto errors ───────────────────────────────────────────────────
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("nonce counter exhausted")]
    NonceExhausted,

    // ── Certificate errors ──────────────────────────────────────────────
    #[error("certificate build error: {0}")]
    CertificateBuild(String),

    #[error("certificate deserialization error: {0}")]
    CertificateDeserialization(String),

    #[error("certificate version unsupported: {0}")]
    CertificateVersionUnsupported(u8),

    #[error("certificate expired: not_after={not_after}, now={now}")]
    CertificateExpired { not_after: u64, now: u64 },

    #[error("certificate not yet valid: not_before={not_before}, now={now}")]
    CertificateNotYetValid { not_before: u64, now: u64 },

    #[error("certificate issuer is not trusted")]
    UntrustedIssuer,

    #[error("certificate key does not match the peer static key")]
    CertificateMismatch,

    // ── Handshake errors ────────────────────────────────────────────────
    #[error("malformed handshake message: {0}")]
    MalformedMessage(String),

    #[error("invalid state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("symmetric state is poisoned by an earlier failure")]
    Poisoned,

    // ── Configuration ───────────────────────────────────────────────────
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NoiseError {
    /// Whether the error means the peer failed authentication or integrity
    /// checks, as opposed to a local misuse or configuration problem.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            NoiseError::Decryption(_)
                | NoiseError::SignatureVerification
                | NoiseError::CertificateExpired { .. }
                | NoiseError::CertificateNotYetValid { .. }
                | NoiseError::UntrustedIssuer
                | NoiseError::CertificateMismatch
        )
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, NoiseError>;
