// Certificate builder: fluent API for issuing a signed NoiseCertificate.

use std::time::Duration;

use crate::cert::{unix_now, NoiseCertificate};
use crate::crypto::keys::IdentityKeyPair;
use crate::error::{NoiseError, Result};

/// Builder for a [`NoiseCertificate`] signed by `issuer`.
///
/// # Example
/// ```ignore
/// let cert = CertificateBuilder::new(&issuer)
///     .key(server_static.public_key_bytes())
///     .serial(7)
///     .valid_for(Duration::from_secs(86400 * 30))
///     .build()?;
/// ```
pub struct CertificateBuilder<'a> {
    issuer: &'a IdentityKeyPair,
    serial: u32,
    key: Option<[u8; 32]>,
    valid_from: Option<u64>,
    valid_until: Option<u64>,
}

impl<'a> CertificateBuilder<'a> {
    pub fn new(issuer: &'a IdentityKeyPair) -> Self {
        Self {
            issuer,
            serial: 0,
            key: None,
            valid_from: None,
            valid_until: None,
        }
    }

    /// The X25519 static key being certified.
    pub fn key(mut self, key: [u8; 32]) -> Self {
        self.key = Some(key);
        self
    }

    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    /// Set explicit validity window (unix timestamps in seconds).
    pub fn validity(mut self, from: u64, until: u64) -> Self {
        self.valid_from = Some(from);
        self.valid_until = Some(until);
        self
    }

    /// Validity of `duration` starting at `now`. Deterministic for tests.
    pub fn valid_for_from(mut self, now: u64, duration: Duration) -> Self {
        self.valid_from = Some(now);
        self.valid_until = Some(now.saturating_add(duration.as_secs()));
        self
    }

    /// Validity of `duration` starting at the current wall-clock time.
    pub fn valid_for(self, duration: Duration) -> Self {
        self.valid_for_from(unix_now(), duration)
    }

    /// Consume the builder and produce a signed [`NoiseCertificate`].
    pub fn build(self) -> Result<NoiseCertificate> {
        let key = self
            .key
            .ok_or_else(|| NoiseError::CertificateBuild("key is required".into()))?;
        let valid_from = self
            .valid_from
            .ok_or_else(|| NoiseError::CertificateBuild("validity window is required".into()))?;
        let valid_until = self
            .valid_until
            .ok_or_else(|| NoiseError::CertificateBuild("validity window is required".into()))?;

        if valid_until <= valid_from {
            return Err(NoiseError::CertificateBuild(
                "valid_until must be after valid_from".into(),
            ));
        }

        let mut cert = NoiseCertificate {
            serial: self.serial,
            key,
            issuer_public_key: self.issuer.public_key_bytes(),
            valid_from,
            valid_until,
            signature: [0u8; 64],
        };
        cert.signature = self.issuer.sign(&cert.signable_bytes());
        Ok(cert)
    }
}
