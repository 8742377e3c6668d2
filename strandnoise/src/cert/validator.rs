// Certificate validation: issuer pinning, signature, and validity window.

use tracing::warn;

use crate::cert::NoiseCertificate;
use crate::config::NoiseConfig;
use crate::crypto::keys::verify_signature;
use crate::error::{NoiseError, Result};

/// Validate a certificate's Ed25519 signature and validity window.
///
/// `now` is the current unix timestamp in seconds (caller-provided for testability).
pub fn validate(cert: &NoiseCertificate, now: u64) -> Result<()> {
    verify_signature(&cert.issuer_public_key, &cert.signable_bytes(), &cert.signature)?;

    if now < cert.valid_from {
        return Err(NoiseError::CertificateNotYetValid {
            not_before: cert.valid_from,
            now,
        });
    }
    if now > cert.valid_until {
        return Err(NoiseError::CertificateExpired {
            not_after: cert.valid_until,
            now,
        });
    }
    Ok(())
}

/// Decides which peer certificates an initiator accepts.
#[derive(Debug, Clone, Default)]
pub struct CertificateVerifier {
    trusted_issuers: Vec<[u8; 32]>,
}

impl CertificateVerifier {
    /// Accept any issuer whose signature verifies.
    pub fn any_issuer() -> Self {
        Self::default()
    }

    /// Accept only certificates signed by one of `issuers`.
    pub fn pinned(issuers: impl IntoIterator<Item = [u8; 32]>) -> Self {
        Self {
            trusted_issuers: issuers.into_iter().collect(),
        }
    }

    pub fn from_config(config: &NoiseConfig) -> Self {
        Self::pinned(config.trusted_issuers.iter().copied())
    }

    pub fn verify(&self, cert: &NoiseCertificate, now: u64) -> Result<()> {
        if !self.trusted_issuers.is_empty()
            && !self.trusted_issuers.contains(&cert.issuer_public_key)
        {
            warn!(serial = cert.serial, "certificate issuer not pinned");
            return Err(NoiseError::UntrustedIssuer);
        }
        validate(cert, now)
    }
}
