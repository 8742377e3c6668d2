// Symmetric handshake state: transcript hash, key mixing, AEAD with
// counter nonces, and the one-time split into directional transport keys.
//
//   new ──authenticate/mix_into_key/encrypt/decrypt──> finish_init ──> transport
//
// During the handshake a single key and counter serve both directions, so
// they are stored once. The split replaces them with a send/recv pair.

use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::NoiseConfig;
use crate::crypto::aead::{counter_nonce, AeadKey, CipherSuite};
use crate::crypto::hash::{hash_chained, hash_sha256};
use crate::crypto::kdf::derive_halves;
use crate::error::{NoiseError, Result};

/// Which side of the handshake this state belongs to.
///
/// Only affects the orientation of the final key split: the initiator sends
/// with the first HKDF half, the responder receives with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct HandshakeKeys {
    hash: [u8; 32],
    salt: [u8; 32],
    key: [u8; 32],
    counter: u32,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct TransportKeys {
    send: [u8; 32],
    recv: [u8; 32],
    write_counter: u32,
    read_counter: u32,
}

enum Phase {
    Handshake(HandshakeKeys),
    Transport(TransportKeys),
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Phase::Handshake(_) => "handshake",
            Phase::Transport(_) => "transport",
        }
    }
}

/// Per-connection cryptographic state.
///
/// Not `Clone`: duplicating it would let two writers reuse a nonce.
pub struct SymmetricState {
    role: Role,
    suite: CipherSuite,
    phase: Phase,
    poisoned: bool,
}

impl SymmetricState {
    /// Initialize the transcript from the protocol name and fold in the
    /// preamble.
    pub fn new(config: &NoiseConfig, role: Role) -> Self {
        let name = config.protocol_name.as_bytes();
        let hash = if name.len() == 32 {
            let mut h = [0u8; 32];
            h.copy_from_slice(name);
            h
        } else {
            hash_sha256(name)
        };

        let mut state = Self {
            role,
            suite: config.cipher_suite,
            phase: Phase::Handshake(HandshakeKeys {
                hash,
                salt: hash,
                key: hash,
                counter: 0,
            }),
            poisoned: false,
        };
        state.authenticate(&config.preamble);
        state
    }

    /// Initiator state: the local static public key is bound into the
    /// transcript before any peer data arrives.
    pub fn initiator(config: &NoiseConfig, local_static_public: &[u8; 32]) -> Self {
        let mut state = Self::new(config, Role::Initiator);
        state.authenticate(local_static_public);
        state
    }

    /// Responder state. The initiator's hello key is authenticated when the
    /// hello arrives.
    pub fn responder(config: &NoiseConfig) -> Self {
        Self::new(config, Role::Responder)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// True once `finish_init` has split the keys. Never reverts.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Transport(_))
    }

    /// True after any integrity, authentication or nonce failure.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Current transcript hash, `None` once the handshake has finished.
    pub fn handshake_hash(&self) -> Option<[u8; 32]> {
        match &self.phase {
            Phase::Handshake(keys) => Some(keys.hash),
            Phase::Transport(_) => None,
        }
    }

    /// Counter the next `decrypt` will use.
    pub fn read_counter(&self) -> u32 {
        match &self.phase {
            Phase::Handshake(keys) => keys.counter,
            Phase::Transport(keys) => keys.read_counter,
        }
    }

    /// Counter the next `encrypt` will use.
    pub fn write_counter(&self) -> u32 {
        match &self.phase {
            Phase::Handshake(keys) => keys.counter,
            Phase::Transport(keys) => keys.write_counter,
        }
    }

    /// Fold wire bytes into the transcript: `hash = SHA-256(hash || data)`.
    /// Inert once finished.
    pub fn authenticate(&mut self, data: &[u8]) {
        if let Phase::Handshake(keys) = &mut self.phase {
            keys.hash = hash_chained(&keys.hash, data);
        }
    }

    /// Encrypt with the current outbound key and write counter. AAD is the
    /// transcript hash (empty after the split). The ciphertext is then
    /// authenticated, mirroring what the receiver does with its input.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_usable()?;
        let suite = self.suite;
        let result = match &mut self.phase {
            Phase::Handshake(keys) => seal(suite, &keys.key, &mut keys.counter, plaintext, &keys.hash),
            Phase::Transport(keys) => seal(suite, &keys.send, &mut keys.write_counter, plaintext, &[]),
        };
        match result {
            Ok(ciphertext) => {
                self.authenticate(&ciphertext);
                Ok(ciphertext)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Decrypt `ciphertext || tag` with the current inbound key and counter,
    /// then authenticate the received bytes. A failed tag poisons the state.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_usable()?;
        let suite = self.suite;
        let result = match &mut self.phase {
            Phase::Handshake(keys) => open(suite, &keys.key, &mut keys.counter, ciphertext, &keys.hash),
            Phase::Transport(keys) => open(suite, &keys.recv, &mut keys.read_counter, ciphertext, &[]),
        };
        match result {
            Ok(plaintext) => {
                self.authenticate(ciphertext);
                Ok(plaintext)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Mix Diffie-Hellman output into the chaining salt and shared key.
    /// Counters restart at zero under the new key.
    pub fn mix_into_key(&mut self, material: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        let keys = match &mut self.phase {
            Phase::Handshake(keys) => keys,
            Phase::Transport(_) => {
                return Err(NoiseError::InvalidState {
                    expected: "handshake",
                    found: "transport",
                })
            }
        };
        match derive_halves(&keys.salt, material) {
            Ok((salt, key)) => {
                keys.salt = salt;
                keys.key = key;
                keys.counter = 0;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Split the handshake into independent send/receive keys. The
    /// transcript is discarded and `authenticate` becomes inert.
    pub fn finish_init(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let salt = match &self.phase {
            Phase::Handshake(keys) => keys.salt,
            Phase::Transport(_) => {
                return Err(NoiseError::InvalidState {
                    expected: "handshake",
                    found: "transport",
                })
            }
        };
        let (first, second) = match derive_halves(&salt, &[]) {
            Ok(halves) => halves,
            Err(e) => return Err(self.fail(e)),
        };
        let (send, recv) = match self.role {
            Role::Initiator => (first, second),
            Role::Responder => (second, first),
        };
        self.phase = Phase::Transport(TransportKeys {
            send,
            recv,
            write_counter: 0,
            read_counter: 0,
        });
        debug!(role = ?self.role, "handshake finished, transport keys split");
        Ok(())
    }

    /// Mark the state unusable. Called by the handshake drivers on
    /// authentication failures detected outside the AEAD.
    pub fn poison(&mut self) {
        if !self.poisoned {
            warn!(role = ?self.role, phase = self.phase.label(), "symmetric state poisoned");
        }
        self.poisoned = true;
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(NoiseError::Poisoned);
        }
        Ok(())
    }

    fn fail(&mut self, err: NoiseError) -> NoiseError {
        warn!(role = ?self.role, phase = self.phase.label(), error = %err, "cipher operation failed");
        self.poisoned = true;
        err
    }

    #[cfg(test)]
    fn keys(&self) -> ([u8; 32], [u8; 32]) {
        match &self.phase {
            Phase::Handshake(keys) => (keys.key, keys.key),
            Phase::Transport(keys) => (keys.send, keys.recv),
        }
    }
}

impl std::fmt::Debug for SymmetricState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricState")
            .field("role", &self.role)
            .field("suite", &self.suite)
            .field("phase", &self.phase.label())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

fn seal(
    suite: CipherSuite,
    key: &[u8; 32],
    counter: &mut u32,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let next = counter.checked_add(1).ok_or(NoiseError::NonceExhausted)?;
    let ciphertext = AeadKey::new(suite, *key).encrypt(&counter_nonce(*counter), plaintext, aad)?;
    *counter = next;
    Ok(ciphertext)
}

fn open(
    suite: CipherSuite,
    key: &[u8; 32],
    counter: &mut u32,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let next = counter.checked_add(1).ok_or(NoiseError::NonceExhausted)?;
    let plaintext = AeadKey::new(suite, *key).decrypt(&counter_nonce(*counter), ciphertext, aad)?;
    *counter = next;
    Ok(plaintext)
}
