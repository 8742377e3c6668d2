// Handshake drivers. Each call consumes one inbound message, advances the
// caller's `SymmetricState`, and produces the next outbound message.
//
//   Initiator (s_i, e_i)                        Responder (s_r, e_r)
//     |--- ClientHello { s_i } --------------------->|
//     |<-- HandshakeMessage { e_r, s_r, cert } ------|
//     |--- ClientFinish { e_i, payload } ----------->|
//     |== finish_init on both sides: transport ======|
//
// Any failure poisons the state passed in.

use tracing::debug;

use crate::cert::serializer;
use crate::cert::validator::CertificateVerifier;
use crate::cert::{unix_now, NoiseCertificate};
use crate::config::NoiseConfig;
use crate::crypto::x25519::KeyPair;
use crate::error::{NoiseError, Result};
use crate::handshake::messages::{ClientFinish, ClientHello, HandshakeMessage};
use crate::handshake::state::{Role, SymmetricState};

fn ensure_handshake(state: &SymmetricState, role: Role) -> Result<()> {
    if state.is_poisoned() {
        return Err(NoiseError::Poisoned);
    }
    if state.is_finished() {
        return Err(NoiseError::InvalidState {
            expected: "handshake",
            found: "transport",
        });
    }
    if state.role() != role {
        return Err(NoiseError::InvalidState {
            expected: role_label(role),
            found: role_label(state.role()),
        });
    }
    Ok(())
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Initiator => "initiator",
        Role::Responder => "responder",
    }
}

/// Run `step` against `state`, poisoning it if the step fails.
fn guarded<T>(
    state: &mut SymmetricState,
    step: impl FnOnce(&mut SymmetricState) -> Result<T>,
) -> Result<T> {
    let result = step(state);
    if let Err(e) = &result {
        debug!(role = ?state.role(), error = %e, "handshake step failed");
        state.poison();
    }
    result
}

fn public_key(bytes: &[u8], what: &str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| NoiseError::InvalidKey(format!("{what} is {} bytes, expected 32", bytes.len())))
}

// ── Initiator ────────────────────────────────────────────────────────────

/// A server hello that passed every check.
#[derive(Debug, Clone)]
pub struct AcceptedServer {
    /// Encrypted response key, the first field of [`ClientFinish`].
    pub response: Vec<u8>,
    /// The certificate over the server static key.
    pub certificate: NoiseCertificate,
}

/// Client side of the handshake.
pub struct Initiator {
    local_static: KeyPair,
    verifier: CertificateVerifier,
}

impl Initiator {
    pub fn new(local_static: KeyPair, verifier: CertificateVerifier) -> Self {
        Self {
            local_static,
            verifier,
        }
    }

    /// Initiator whose certificate trust comes from `config.trusted_issuers`.
    pub fn from_config(local_static: KeyPair, config: &NoiseConfig) -> Self {
        Self::new(local_static, CertificateVerifier::from_config(config))
    }

    pub fn local_static_public(&self) -> [u8; 32] {
        self.local_static.public_key_bytes()
    }

    /// Fresh symmetric state with the local static key already bound.
    pub fn new_state(&self, config: &NoiseConfig) -> SymmetricState {
        SymmetricState::initiator(config, &self.local_static_public())
    }

    /// Message 1.
    pub fn hello(&self) -> ClientHello {
        ClientHello {
            ephemeral: self.local_static_public(),
        }
    }

    /// Message 2 -> response key ciphertext, checking the certificate against
    /// the wall clock.
    pub fn process_handshake(
        &self,
        state: &mut SymmetricState,
        message: &HandshakeMessage,
        local_ephemeral: &KeyPair,
    ) -> Result<Vec<u8>> {
        self.process_handshake_at(state, message, local_ephemeral, unix_now())
    }

    /// Consume the server hello and return the encrypted response key.
    ///
    /// Does not split the keys: the caller calls `finish_init` once the
    /// response (and any login payload, see [`Initiator::finish`]) has been
    /// scheduled for transmission.
    pub fn process_handshake_at(
        &self,
        state: &mut SymmetricState,
        message: &HandshakeMessage,
        local_ephemeral: &KeyPair,
        now: u64,
    ) -> Result<Vec<u8>> {
        self.verify_server_hello(state, message, local_ephemeral, now)
            .map(|accepted| accepted.response)
    }

    /// Same as [`Initiator::process_handshake_at`], also returning the
    /// certificate that vouched for the server static key.
    pub fn verify_server_hello(
        &self,
        state: &mut SymmetricState,
        message: &HandshakeMessage,
        local_ephemeral: &KeyPair,
        now: u64,
    ) -> Result<AcceptedServer> {
        ensure_handshake(state, Role::Initiator)?;
        guarded(state, |state| {
            state.authenticate(&message.ephemeral);
            state.mix_into_key(&self.local_static.diffie_hellman(&message.ephemeral)?)?;

            let decrypted = state.decrypt(&message.static_encrypted)?;
            let remote_static = public_key(&decrypted, "server static key")?;
            state.mix_into_key(&self.local_static.diffie_hellman(&remote_static)?)?;

            let cert_plain = state.decrypt(&message.payload_encrypted)?;
            let certificate = serializer::deserialize(&cert_plain)?;
            self.verifier.verify(&certificate, now)?;
            if certificate.key != remote_static {
                return Err(NoiseError::CertificateMismatch);
            }

            let response = state.encrypt(&local_ephemeral.public_key_bytes())?;
            state.mix_into_key(&local_ephemeral.diffie_hellman(&message.ephemeral)?)?;

            debug!(serial = certificate.serial, "server hello accepted");
            Ok(AcceptedServer {
                response,
                certificate,
            })
        })
    }

    /// Message 3: the response from [`Initiator::process_handshake`] plus the
    /// encrypted login payload.
    pub fn finish(
        &self,
        state: &mut SymmetricState,
        response: Vec<u8>,
        payload: &[u8],
    ) -> Result<ClientFinish> {
        ensure_handshake(state, Role::Initiator)?;
        let payload_encrypted = guarded(state, |state| state.encrypt(payload))?;
        Ok(ClientFinish {
            static_encrypted: response,
            payload_encrypted,
        })
    }
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("local_static", &self.local_static)
            .field("verifier", &self.verifier)
            .finish()
    }
}

// ── Responder ────────────────────────────────────────────────────────────

/// Server side of the handshake. Holds the static key and the certificate
/// that vouches for it.
pub struct Responder {
    local_static: KeyPair,
    certificate: NoiseCertificate,
}

impl Responder {
    /// Fails with [`NoiseError::CertificateMismatch`] if `certificate` does
    /// not cover `local_static`.
    pub fn new(local_static: KeyPair, certificate: NoiseCertificate) -> Result<Self> {
        if certificate.key != local_static.public_key_bytes() {
            return Err(NoiseError::CertificateMismatch);
        }
        Ok(Self {
            local_static,
            certificate,
        })
    }

    #[cfg(test)]
    fn unchecked(local_static: KeyPair, certificate: NoiseCertificate) -> Self {
        Self {
            local_static,
            certificate,
        }
    }

    pub fn local_static_public(&self) -> [u8; 32] {
        self.local_static.public_key_bytes()
    }

    pub fn certificate(&self) -> &NoiseCertificate {
        &self.certificate
    }

    pub fn new_state(&self, config: &NoiseConfig) -> SymmetricState {
        SymmetricState::responder(config)
    }

    /// Message 1 -> message 2. The same `local_ephemeral` must be passed to
    /// [`Responder::process_finish`].
    pub fn process_hello(
        &self,
        state: &mut SymmetricState,
        hello: &ClientHello,
        local_ephemeral: &KeyPair,
    ) -> Result<HandshakeMessage> {
        ensure_handshake(state, Role::Responder)?;
        guarded(state, |state| {
            let ephemeral = local_ephemeral.public_key_bytes();
            state.authenticate(&hello.ephemeral);
            state.authenticate(&ephemeral);
            state.mix_into_key(&local_ephemeral.diffie_hellman(&hello.ephemeral)?)?;

            let static_encrypted = state.encrypt(&self.local_static_public())?;
            state.mix_into_key(&self.local_static.diffie_hellman(&hello.ephemeral)?)?;

            let payload_encrypted = state.encrypt(&serializer::serialize(&self.certificate))?;
            debug!(serial = self.certificate.serial, "server hello built");
            Ok(HandshakeMessage {
                ephemeral,
                static_encrypted,
                payload_encrypted,
            })
        })
    }

    /// Message 3 -> the initiator's login payload. Does not split the keys.
    pub fn process_finish(
        &self,
        state: &mut SymmetricState,
        finish: &ClientFinish,
        local_ephemeral: &KeyPair,
    ) -> Result<Vec<u8>> {
        ensure_handshake(state, Role::Responder)?;
        guarded(state, |state| {
            let decrypted = state.decrypt(&finish.static_encrypted)?;
            let response = public_key(&decrypted, "client response key")?;
            state.mix_into_key(&local_ephemeral.diffie_hellman(&response)?)?;
            state.decrypt(&finish.payload_encrypted)
        })
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("local_static", &self.local_static)
            .field("serial", &self.certificate.serial)
            .finish()
    }
}
