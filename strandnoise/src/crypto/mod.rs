// Crypto module declarations

pub mod aead;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod x25519;
