// StrandNoise benchmarks using criterion.
//
// Measures:
//   - AEAD encrypt at various payload sizes, per cipher suite
//   - Full three-message handshake plus key split
//   - Transport encrypt/decrypt through a finished SymmetricState

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use strandnoise::cert::builder::CertificateBuilder;
use strandnoise::cert::validator::CertificateVerifier;
use strandnoise::crypto::aead::{counter_nonce, AeadKey};
use strandnoise::crypto::keys::IdentityKeyPair;
use strandnoise::{CipherSuite, Initiator, KeyPair, NoiseConfig, Responder, SymmetricState};

const SIZES: [usize; 4] = [64, 1024, 16 * 1024, 64 * 1024];

// ---------------------------------------------------------------------------
// AEAD
// ---------------------------------------------------------------------------

fn bench_aead(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead_encrypt");
    for suite in [CipherSuite::Aes256Gcm, CipherSuite::ChaCha20Poly1305] {
        let key = AeadKey::new(suite, [0x42; 32]);
        for size in SIZES {
            let payload = vec![0xABu8; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{suite:?}"), size),
                &payload,
                |b, payload| {
                    b.iter(|| black_box(key.encrypt(&counter_nonce(1), payload, b"").unwrap()));
                },
            );
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

fn handshake(
    config: &NoiseConfig,
    initiator: &Initiator,
    responder: &Responder,
) -> (SymmetricState, SymmetricState) {
    let mut client = initiator.new_state(config);
    let mut server = responder.new_state(config);
    let server_eph = KeyPair::generate();
    let client_eph = KeyPair::generate();

    let msg = responder
        .process_hello(&mut server, &initiator.hello(), &server_eph)
        .unwrap();
    let response = initiator
        .process_handshake_at(&mut client, &msg, &client_eph, 5_000)
        .unwrap();
    let finish = initiator.finish(&mut client, response, b"").unwrap();
    responder
        .process_finish(&mut server, &finish, &server_eph)
        .unwrap();
    client.finish_init().unwrap();
    server.finish_init().unwrap();
    (client, server)
}

fn fixture() -> (Initiator, Responder) {
    let issuer = IdentityKeyPair::generate();
    let server_static = KeyPair::generate();
    let cert = CertificateBuilder::new(&issuer)
        .key(server_static.public_key_bytes())
        .validity(1_000, 9_999_999)
        .build()
        .unwrap();
    (
        Initiator::new(KeyPair::generate(), CertificateVerifier::any_issuer()),
        Responder::new(server_static, cert).unwrap(),
    )
}

fn bench_handshake(c: &mut Criterion) {
    let config = NoiseConfig::default();
    let (initiator, responder) = fixture();
    c.bench_function("full_handshake", |b| {
        b.iter(|| black_box(handshake(&config, &initiator, &responder)));
    });
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

fn bench_transport(c: &mut Criterion) {
    let config = NoiseConfig::default();
    let (initiator, responder) = fixture();
    let mut group = c.benchmark_group("transport_roundtrip");
    for size in SIZES {
        let payload = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            // Fresh pair per batch so counters never approach exhaustion.
            b.iter_batched(
                || handshake(&config, &initiator, &responder),
                |(mut client, mut server)| {
                    let ct = client.encrypt(payload).unwrap();
                    black_box(server.decrypt(&ct).unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aead, bench_handshake, bench_transport);
criterion_main!(benches);
