// Handshake: symmetric state, wire messages, and the initiator/responder drivers.

pub mod messages;
pub mod protocol;
pub mod state;
