// Decoders for decrypted transport payloads.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{Result, WireError};

/// Turns one decrypted frame body into an application message.
///
/// Only inbound payloads pass through a codec; outbound messages reach the
/// framer already serialized.
pub trait MessageCodec {
    type Message;

    fn decode(&self, payload: &[u8]) -> Result<Self::Message>;
}

/// Passes payloads through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl MessageCodec for RawCodec {
    type Message = Bytes;

    fn decode(&self, payload: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(payload))
    }
}

/// Decodes each payload as one JSON document of type `T`.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec")
            .field("message", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> MessageCodec for JsonCodec<T> {
    type Message = T;

    fn decode(&self, payload: &[u8]) -> Result<T> {
        serde_json::from_slice(payload).map_err(|e| WireError::Codec(e.to_string()))
    }
}
