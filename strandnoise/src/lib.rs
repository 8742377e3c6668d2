// StrandNoise: Noise XX handshake, symmetric state and transport cipher
//
// Crate root: module declarations and public re-exports.

pub mod error;
pub mod config;
pub mod crypto;
pub mod cert;
pub mod handshake;

// Re-export key types at crate root for convenience.
pub use config::NoiseConfig;
pub use crypto::aead::CipherSuite;
pub use crypto::x25519::KeyPair;
pub use error::{NoiseError, Result};
pub use handshake::protocol::{AcceptedServer, Initiator, Responder};
pub use handshake::state::{Role, SymmetricState};
