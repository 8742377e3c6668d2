// HKDF-SHA256 key mixing.
//
//   okm = HKDF(salt, ikm, info = "", L = 64)
//   (first, second) = (okm[..32], okm[32..])
//
// A handshake key mix uses (first, second) as (next salt, shared key); the
// final split uses them as the two directional transport keys.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{NoiseError, Result};

/// Derive two 32-byte halves from `salt` and input key material `ikm`.
pub fn derive_halves(salt: &[u8; 32], ikm: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), ikm);
    let mut okm = [0u8; 64];
    hk.expand(&[], &mut okm)
        .map_err(|e| NoiseError::KeyDerivation(format!("HKDF expand error: {e}")))?;

    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    first.copy_from_slice(&okm[..32]);
    second.copy_from_slice(&okm[32..]);
    okm.zeroize();
    Ok((first, second))
}
