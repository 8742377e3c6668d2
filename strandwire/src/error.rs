use std::time::Duration;

use strandnoise::NoiseError;
use thiserror::Error;

/// All errors produced by the StrandWire framing and connection layers.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("noise: {0}")]
    Noise(#[from] NoiseError),

    /// Inbound length prefix above the cap. Poisons the connection.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Outbound payload refused before encryption; nothing was sent.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("peer did not send the expected preamble")]
    BadPreamble,

    #[error("message decode failed: {0}")]
    Codec(String),

    #[error("unexpected {0} frame")]
    UnexpectedFrame(&'static str),

    #[error("connection closed mid-frame ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Whether the connection is unusable after this error. Agrees with the
    /// framer: every fatal error it returns has poisoned its state.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WireError::Codec(_) | WireError::PayloadTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
