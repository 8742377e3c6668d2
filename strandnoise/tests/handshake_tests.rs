// Integration tests for the XX handshake and the transport split.

use strandnoise::cert::builder::CertificateBuilder;
use strandnoise::cert::validator::CertificateVerifier;
use strandnoise::crypto::keys::IdentityKeyPair;
use strandnoise::handshake::messages::{ClientFinish, ClientHello, HandshakeMessage};
use strandnoise::{
    CipherSuite, Initiator, KeyPair, NoiseConfig, NoiseError, Responder, SymmetricState,
};

const NOW: u64 = 5_000;

struct Fixture {
    config: NoiseConfig,
    issuer: IdentityKeyPair,
    initiator: Initiator,
    responder: Responder,
}

impl Fixture {
    fn new(config: NoiseConfig) -> Self {
        let issuer = IdentityKeyPair::generate();
        let server_static = KeyPair::generate();
        let cert = CertificateBuilder::new(&issuer)
            .key(server_static.public_key_bytes())
            .serial(42)
            .validity(1_000, 9_999_999)
            .build()
            .unwrap();
        let initiator = Initiator::new(
            KeyPair::generate(),
            CertificateVerifier::pinned([issuer.public_key_bytes()]),
        );
        Self {
            config,
            issuer,
            initiator,
            responder: Responder::new(server_static, cert).unwrap(),
        }
    }

    /// Runs all three messages and splits both states.
    fn complete(&self, login: &[u8]) -> (SymmetricState, SymmetricState, Vec<u8>) {
        let mut client = self.initiator.new_state(&self.config);
        let mut server = self.responder.new_state(&self.config);
        let server_eph = KeyPair::generate();
        let client_eph = KeyPair::generate();

        // Each message crosses the wire in its encoded form.
        let hello = ClientHello::decode(&self.initiator.hello().encode()).unwrap();
        let msg = self
            .responder
            .process_hello(&mut server, &hello, &server_eph)
            .unwrap();
        let msg = HandshakeMessage::decode(&msg.encode().unwrap()).unwrap();

        let response = self
            .initiator
            .process_handshake_at(&mut client, &msg, &client_eph, NOW)
            .unwrap();
        let finish = self.initiator.finish(&mut client, response, login).unwrap();
        client.finish_init().unwrap();

        let finish = ClientFinish::decode(&finish.encode().unwrap()).unwrap();
        let payload = self
            .responder
            .process_finish(&mut server, &finish, &server_eph)
            .unwrap();
        server.finish_init().unwrap();

        (client, server, payload)
    }
}

// ── Full handshake ───────────────────────────────────────────────────────

#[test]
fn full_handshake_then_transport_both_ways() {
    let fx = Fixture::new(NoiseConfig::default());
    let (mut client, mut server, login) = fx.complete(b"login token");
    assert_eq!(login, b"login token");
    assert!(client.is_finished() && server.is_finished());

    for i in 0..5u32 {
        let msg = format!("client frame {i}");
        let ct = client.encrypt(msg.as_bytes()).unwrap();
        assert_eq!(server.decrypt(&ct).unwrap(), msg.as_bytes());
    }
    let ct = server.encrypt(b"server frame").unwrap();
    assert_eq!(client.decrypt(&ct).unwrap(), b"server frame");

    assert_eq!((client.write_counter(), client.read_counter()), (5, 1));
    assert_eq!((server.write_counter(), server.read_counter()), (1, 5));
}

#[test]
fn chacha_suite_completes() {
    let fx = Fixture::new(NoiseConfig::with_suite(CipherSuite::ChaCha20Poly1305));
    let (mut client, mut server, _) = fx.complete(b"");
    assert_eq!(client.suite(), CipherSuite::ChaCha20Poly1305);
    let ct = client.encrypt(b"ping").unwrap();
    assert_eq!(server.decrypt(&ct).unwrap(), b"ping");
}

#[test]
fn each_session_uses_fresh_keys() {
    let fx = Fixture::new(NoiseConfig::default());
    let (mut first, _, _) = fx.complete(b"");
    let (_, mut second_server, _) = fx.complete(b"");

    let ct = first.encrypt(b"replayed").unwrap();
    assert!(second_server.decrypt(&ct).is_err());
    assert!(second_server.is_poisoned());
}

#[test]
fn mismatched_preambles_fail_the_handshake() {
    let fx = Fixture::new(NoiseConfig::default());
    let mut client = fx.initiator.new_state(&NoiseConfig::default().preamble(*b"XX\x01\x00"));
    let mut server = fx.responder.new_state(&fx.config);
    let server_eph = KeyPair::generate();

    let msg = fx
        .responder
        .process_hello(&mut server, &fx.initiator.hello(), &server_eph)
        .unwrap();
    let err = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap_err();
    assert!(matches!(err, NoiseError::Decryption(_)));
    assert!(client.is_poisoned());
}

// ── Tampering ────────────────────────────────────────────────────────────

#[test]
fn tampered_server_static_is_rejected() {
    let fx = Fixture::new(NoiseConfig::default());
    let mut client = fx.initiator.new_state(&fx.config);
    let mut server = fx.responder.new_state(&fx.config);
    let server_eph = KeyPair::generate();

    let mut msg = fx
        .responder
        .process_hello(&mut server, &fx.initiator.hello(), &server_eph)
        .unwrap();
    msg.static_encrypted[3] ^= 0x01;

    let err = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(client.is_poisoned());
    assert!(matches!(client.encrypt(b"x"), Err(NoiseError::Poisoned)));
}

#[test]
fn tampered_login_payload_poisons_responder() {
    let fx = Fixture::new(NoiseConfig::default());
    let mut client = fx.initiator.new_state(&fx.config);
    let mut server = fx.responder.new_state(&fx.config);
    let server_eph = KeyPair::generate();

    let msg = fx
        .responder
        .process_hello(&mut server, &fx.initiator.hello(), &server_eph)
        .unwrap();
    let response = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap();
    let mut finish = fx.initiator.finish(&mut client, response, b"secret").unwrap();
    finish.payload_encrypted[0] ^= 0xFF;

    assert!(fx
        .responder
        .process_finish(&mut server, &finish, &server_eph)
        .is_err());
    assert!(server.is_poisoned());
    assert!(matches!(server.finish_init(), Err(NoiseError::Poisoned)));
}

#[test]
fn tampered_transport_frame_poisons_receiver() {
    let fx = Fixture::new(NoiseConfig::default());
    let (mut client, mut server, _) = fx.complete(b"");
    let mut ct = client.encrypt(b"data").unwrap();
    let last = ct.len() - 1;
    ct[last] ^= 0x01;

    assert!(matches!(server.decrypt(&ct), Err(NoiseError::Decryption(_))));
    let next = client.encrypt(b"next").unwrap();
    assert!(matches!(server.decrypt(&next), Err(NoiseError::Poisoned)));
}

#[test]
fn every_single_bit_flip_in_ciphertext_or_tag_is_caught() {
    let fx = Fixture::new(NoiseConfig::default());
    let plaintext = b"flip";
    let bits = (plaintext.len() + 16) * 8;

    for bit in 0..bits {
        let (mut client, mut server, _) = fx.complete(b"");
        let mut ct = client.encrypt(plaintext).unwrap();
        assert_eq!(ct.len() * 8, bits);
        ct[bit / 8] ^= 1 << (bit % 8);

        assert!(
            matches!(server.decrypt(&ct), Err(NoiseError::Decryption(_))),
            "bit {bit} went undetected"
        );
        assert!(server.is_poisoned());
    }
}

// ── Certificates ─────────────────────────────────────────────────────────

#[test]
fn responder_refuses_certificate_for_another_key() {
    let fx = Fixture::new(NoiseConfig::default());
    let cert = CertificateBuilder::new(&fx.issuer)
        .key(KeyPair::generate().public_key_bytes())
        .validity(1_000, 9_999_999)
        .build()
        .unwrap();
    let err = Responder::new(KeyPair::generate(), cert).unwrap_err();
    assert!(matches!(err, NoiseError::CertificateMismatch));
}

#[test]
fn unpinned_issuer_is_rejected() {
    let fx = Fixture::new(NoiseConfig::default());
    let rogue = IdentityKeyPair::generate();
    let server_static = KeyPair::generate();
    let cert = CertificateBuilder::new(&rogue)
        .key(server_static.public_key_bytes())
        .validity(1_000, 9_999_999)
        .build()
        .unwrap();
    let responder = Responder::new(server_static, cert).unwrap();

    let mut client = fx.initiator.new_state(&fx.config);
    let mut server = responder.new_state(&fx.config);
    let msg = responder
        .process_hello(&mut server, &fx.initiator.hello(), &KeyPair::generate())
        .unwrap();

    let err = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap_err();
    assert!(matches!(err, NoiseError::UntrustedIssuer));
}

#[test]
fn trust_from_config_accepts_listed_issuer() {
    let fx = Fixture::new(NoiseConfig::default());
    let config = NoiseConfig::default().trust_issuer(fx.issuer.public_key_bytes());
    let initiator = Initiator::from_config(KeyPair::generate(), &config);

    let mut client = initiator.new_state(&config);
    let mut server = fx.responder.new_state(&config);
    let server_eph = KeyPair::generate();
    let msg = fx
        .responder
        .process_hello(&mut server, &initiator.hello(), &server_eph)
        .unwrap();
    assert!(initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .is_ok());
}

// ── Misuse ───────────────────────────────────────────────────────────────

#[test]
fn drivers_refuse_a_finished_state() {
    let fx = Fixture::new(NoiseConfig::default());
    let (mut client, _, _) = fx.complete(b"");
    let msg = HandshakeMessage {
        ephemeral: [1; 32],
        static_encrypted: vec![0; 48],
        payload_encrypted: vec![0; 16],
    };
    let err = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap_err();
    assert!(matches!(err, NoiseError::InvalidState { .. }));
}

#[test]
fn low_order_server_ephemeral_is_rejected() {
    let fx = Fixture::new(NoiseConfig::default());
    let mut client = fx.initiator.new_state(&fx.config);
    let mut server = fx.responder.new_state(&fx.config);
    let mut msg = fx
        .responder
        .process_hello(&mut server, &fx.initiator.hello(), &KeyPair::generate())
        .unwrap();
    msg.ephemeral = [0u8; 32];

    let err = fx
        .initiator
        .process_handshake_at(&mut client, &msg, &KeyPair::generate(), NOW)
        .unwrap_err();
    assert!(matches!(err, NoiseError::InvalidKey(_)));
    assert!(client.is_poisoned());
}
