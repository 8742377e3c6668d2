// StrandWire: length-framed encrypted channel over any ordered byte transport
//
// The framer owns one strandnoise `SymmetricState` per connection. Handshake
// frames pass through in cleartext; once the keys are split every frame body
// is an AEAD ciphertext decoded into an application message.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod framer;

pub use codec::{JsonCodec, MessageCodec, RawCodec};
pub use config::WireConfig;
pub use connection::Connection;
pub use error::{Result, WireError};
pub use framer::{Framer, Inbound};
