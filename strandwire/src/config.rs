// Connection configuration, loadable from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strandnoise::NoiseConfig;

use crate::error::{Result, WireError};
use crate::frame::MAX_FRAME_LEN;

/// Default socket read size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Default upper bound on the whole three-message handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Handshake parameters shared with the peer.
    pub noise: NoiseConfig,
    /// Largest frame body accepted or produced, at most 2^24 - 1.
    pub max_frame_len: usize,
    /// Bytes requested per read from the transport.
    pub read_buffer_size: usize,
    /// Handshake deadline in milliseconds; 0 disables it.
    pub handshake_timeout_ms: u64,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::default(),
            max_frame_len: MAX_FRAME_LEN,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

impl WireConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| WireError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.noise.validate()?;
        if self.max_frame_len == 0 || self.max_frame_len > MAX_FRAME_LEN {
            return Err(WireError::Config(format!(
                "max_frame_len must be in 1..={MAX_FRAME_LEN}, got {}",
                self.max_frame_len
            )));
        }
        if self.read_buffer_size == 0 {
            return Err(WireError::Config("read_buffer_size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_ms > 0).then(|| Duration::from_millis(self.handshake_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strandnoise::CipherSuite;

    #[test]
    fn empty_json_is_default() {
        let config = WireConfig::from_json("{}").unwrap();
        assert_eq!(config, WireConfig::default());
        assert_eq!(
            config.handshake_timeout(),
            Some(Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS))
        );
    }

    #[test]
    fn nested_noise_section() {
        let config = WireConfig::from_json(
            r#"{
                "max_frame_len": 4096,
                "handshake_timeout_ms": 0,
                "noise": { "cipher_suite": "chacha20-poly1305", "preamble": [1, 2] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_frame_len, 4096);
        assert_eq!(config.handshake_timeout(), None);
        assert_eq!(config.noise.cipher_suite, CipherSuite::ChaCha20Poly1305);
        assert_eq!(config.noise.preamble, vec![1, 2]);
    }

    #[test]
    fn frame_cap_is_bounded_by_the_length_prefix() {
        let err = WireConfig::from_json(r#"{ "max_frame_len": 16777216 }"#).unwrap_err();
        assert!(matches!(err, WireError::Config(_)));
        assert!(WireConfig::from_json(r#"{ "max_frame_len": 0 }"#).is_err());
    }

    #[test]
    fn invalid_noise_section_is_reported() {
        let err = WireConfig::from_json(r#"{ "noise": { "protocol_name": "" } }"#).unwrap_err();
        assert!(matches!(err, WireError::Noise(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            WireConfig::from_json("{ nope"),
            Err(WireError::Config(_))
        ));
    }
}
