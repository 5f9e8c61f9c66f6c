//! End-to-end negotiation scenarios.
//!
//! Each test builds a client and server policy, runs the handshake to a
//! terminal state and checks the outcome together with the event log shape.

use tlsim_core::{
    Command, CryptoOp, EventKind, FailureReason, FixedKeys, HandshakeState, KeyPurpose,
    NegotiationResult, Session, Side, Simulator,
};
use tlsim_crypto::KeyPair;
use tlsim_proto::{
    CipherSuite, ClientAuth, EcdsaCurve, EndpointPolicy, KeyExchangeGroup, MlDsaLevel,
    RsaKeySize, SignatureAlgorithm, SignatureIdentity, SignatureScheme, TrustAnchor, TrustStore,
};

const RSA: SignatureAlgorithm = SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048);
const MLDSA44: SignatureAlgorithm = SignatureAlgorithm::MlDsa(MlDsaLevel::MlDsa44);
const MLDSA87: SignatureAlgorithm = SignatureAlgorithm::MlDsa(MlDsaLevel::MlDsa87);

fn server_with(identity: SignatureAlgorithm) -> EndpointPolicy {
    EndpointPolicy::builder().identity(SignatureIdentity::new(identity)).build()
}

fn run(client: EndpointPolicy, server: EndpointPolicy) -> Session<FixedKeys> {
    let mut session = Session::new(client, server, FixedKeys::from_seed(7));
    session.run_to_completion().unwrap();
    session
}

fn kinds(session: &Session<FixedKeys>) -> String {
    let kinds: Vec<&str> = session.events().kinds().into_iter().map(EventKind::as_str).collect();
    kinds.join(" ")
}

fn failure(session: &Session<FixedKeys>) -> Option<FailureReason> {
    session.outcome().and_then(NegotiationResult::failure)
}

#[test]
fn client_preferred_suite_is_chosen() {
    let client = EndpointPolicy::builder().cipher_suites([CipherSuite::Aes256GcmSha384]).build();
    let server = server_with(RSA)
        .with_cipher_suites([CipherSuite::Aes256GcmSha384, CipherSuite::Chacha20Poly1305Sha256]);

    let session = run(client, server);
    let established = session.outcome().and_then(NegotiationResult::established).unwrap();
    assert_eq!(established.suite, CipherSuite::Aes256GcmSha384);
    assert_eq!(established.group, KeyExchangeGroup::X25519);
    assert_eq!(established.server_scheme, SignatureScheme::RsaPssRsaeSha256);
    assert_eq!(established.client_identity, None);
    assert_eq!(session.state(), HandshakeState::Established);

    insta::assert_snapshot!(
        kinds(&session),
        @"init client_hello server_hello key_exchange certificate_verify finished finished negotiation_result"
    );
}

#[test]
fn disjoint_suites_fail_at_hello() {
    let client = EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build();
    let server = server_with(RSA).with_cipher_suites([CipherSuite::Chacha20Poly1305Sha256]);

    let session = run(client, server);
    assert_eq!(failure(&session), Some(FailureReason::NoCommonCipherSuite));
    assert_eq!(session.state(), HandshakeState::Failed);
    insta::assert_snapshot!(kinds(&session), @"init client_hello negotiation_result");
    assert!(session.packets().iter().all(|p| p.kind == EventKind::ClientHello));
}

#[test]
fn disjoint_groups_fail_at_hello() {
    let client = EndpointPolicy::builder().groups([KeyExchangeGroup::X25519]).build();
    let server = server_with(RSA).with_groups([KeyExchangeGroup::P384]);

    let session = run(client, server);
    assert_eq!(failure(&session), Some(FailureReason::NoCommonGroup));
    insta::assert_snapshot!(kinds(&session), @"init client_hello negotiation_result");
}

#[test]
fn required_client_certificate_missing() {
    let server = server_with(RSA).with_client_auth(ClientAuth::Require);

    let session = run(EndpointPolicy::default(), server);
    assert_eq!(failure(&session), Some(FailureReason::ClientCertificateRequiredButAbsent));
    insta::assert_snapshot!(kinds(&session), @"init client_hello negotiation_result");
}

#[test]
fn missing_client_certificate_outranks_suite_mismatch() {
    let client = EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build();
    let server = server_with(RSA)
        .with_cipher_suites([CipherSuite::Chacha20Poly1305Sha256])
        .with_client_auth(ClientAuth::Require);

    let session = run(client, server);
    assert_eq!(failure(&session), Some(FailureReason::ClientCertificateRequiredButAbsent));
}

#[test]
fn mldsa_identities_on_both_sides() {
    let client = EndpointPolicy::builder().identity(SignatureIdentity::new(MLDSA44)).build();
    let server = server_with(MLDSA44).with_client_auth(ClientAuth::Require);

    let mut simulator = Simulator::new(client, server, FixedKeys::from_seed(3));
    let record = simulator.run_full_interaction(&[]).unwrap().clone();

    assert!(record.success);
    assert_eq!(record.client_ca, Some(MLDSA44));
    assert_eq!(record.server_ca, Some(MLDSA44));
    let table = tlsim_core::render_table(simulator.history());
    assert_eq!(table.matches("ML-DSA-44").count(), 4);

    let established =
        simulator.session().outcome().and_then(NegotiationResult::established).unwrap();
    assert_eq!(established.server_scheme, SignatureScheme::MlDsa44);
    assert_eq!(established.client_scheme, Some(SignatureScheme::MlDsa44));
    assert_eq!(simulator.session().events().of_kind(EventKind::CertificateVerify).count(), 2);
}

#[test]
fn established_traffic_ends_the_wire_log() {
    let mut session = Session::new(
        EndpointPolicy::default(),
        server_with(RSA),
        FixedKeys::from_seed(11),
    );
    assert!(session.run_to_completion().unwrap().is_established());

    session.send(Side::Client, b"hi").unwrap();
    let delivery = session.receive().unwrap();
    assert_eq!(delivery.plaintext, b"hi");
    assert_eq!(delivery.to, Side::Server);
    session.close(Side::Client).unwrap();

    let wire: Vec<EventKind> = session.events().wire_kinds();
    assert_eq!(
        wire[wire.len() - 5..],
        [
            EventKind::Finished,
            EventKind::Finished,
            EventKind::MessageSent,
            EventKind::MessageReceived,
            EventKind::CloseNotify,
        ]
    );
    insta::assert_snapshot!(
        kinds(&session),
        @"init client_hello server_hello key_exchange certificate_verify finished finished negotiation_result message_sent message_received close_notify"
    );
    assert_eq!(session.events().last().map(|e| e.kind), Some(EventKind::CloseNotify));
}

#[test]
fn server_without_identity() {
    let session = run(EndpointPolicy::default(), EndpointPolicy::default());
    assert_eq!(failure(&session), Some(FailureReason::ServerCertificateAbsent));
    insta::assert_snapshot!(
        kinds(&session),
        @"init client_hello server_hello key_exchange negotiation_result"
    );
}

#[test]
fn default_server_establishes_with_default_client() {
    let session = run(EndpointPolicy::default(), EndpointPolicy::default_server());
    let established = session.outcome().and_then(NegotiationResult::established).unwrap();
    assert_eq!(established.server_identity.algorithm(), RSA);
}

#[test]
fn client_lacks_scheme_family() {
    let client =
        EndpointPolicy::builder().signature_schemes([SignatureScheme::RsaPssRsaeSha256]).build();

    let session = run(client, server_with(MLDSA87));
    assert_eq!(failure(&session), Some(FailureReason::SignatureAlgorithmMismatch));
    assert!(session.events().of_kind(EventKind::CertificateVerify).next().is_none());
    let last = session.events().last().unwrap();
    assert_eq!(
        last.summary,
        "Negotiation Failed: SignatureAlgorithmMismatch (client accepts no ML-DSA scheme)"
    );
}

#[test]
fn client_does_not_trust_server_root() {
    let ecdsa = SignatureAlgorithm::Ecdsa(EcdsaCurve::P256);
    let client = EndpointPolicy::builder()
        .trust(TrustStore::Anchors(vec![TrustAnchor::demo_root(ecdsa)]))
        .build();

    let session = run(client, server_with(RSA));
    assert_eq!(failure(&session), Some(FailureReason::CertificateChainInvalid));
    insta::assert_snapshot!(
        kinds(&session),
        @"init client_hello server_hello key_exchange certificate_verify negotiation_result"
    );
    let summary = &session.events().last().unwrap().summary;
    assert!(summary.contains("Chain of Trust: Unable to find issuer certificate"));
}

#[test]
fn server_does_not_trust_client_root() {
    let client = EndpointPolicy::builder().identity(SignatureIdentity::new(RSA)).build();
    let server = server_with(RSA)
        .with_client_auth(ClientAuth::Require)
        .with_trust(TrustStore::Anchors(vec![TrustAnchor::demo_root(MLDSA44)]));

    let session = run(client, server);
    assert_eq!(failure(&session), Some(FailureReason::CertificateChainInvalid));
    let verifies: Vec<Side> =
        session.events().of_kind(EventKind::CertificateVerify).map(|e| e.side).collect();
    assert_eq!(verifies, [Side::Server, Side::Client]);
}

#[test]
fn requested_certificate_is_optional() {
    let server = server_with(RSA).with_client_auth(ClientAuth::Request);

    let session = run(EndpointPolicy::default(), server);
    let established = session.outcome().and_then(NegotiationResult::established).unwrap();
    assert_eq!(established.client_identity, None);
    assert_eq!(established.client_scheme, None);

    let client_finished = session
        .events()
        .of_kind(EventKind::Finished)
        .find(|e| e.side == Side::Client)
        .unwrap();
    assert!(client_finished.summary.starts_with("empty certificate"));
}

#[test]
fn kem_groups_encapsulate_instead_of_ecdh() {
    let client = EndpointPolicy::builder().groups([KeyExchangeGroup::MlKem768]).build();
    let server = server_with(RSA).with_groups([KeyExchangeGroup::MlKem768]);

    let session = run(client, server);
    assert!(session.outcome().unwrap().is_established());
    assert_eq!(session.crypto().by_operation(CryptoOp::Ecdh).count(), 0);
    assert_eq!(session.crypto().by_operation(CryptoOp::KemEncapsulate).count(), 1);
    assert_eq!(session.crypto().by_operation(CryptoOp::KemDecapsulate).count(), 1);
    assert_eq!(session.crypto().by_operation(CryptoOp::Keygen).count(), 1);
}

#[test]
fn ecdh_runs_on_both_sides() {
    let session = run(EndpointPolicy::default(), server_with(RSA));
    let sides: Vec<Side> = session.crypto().by_operation(CryptoOp::Ecdh).map(|e| e.side).collect();
    assert_eq!(sides, [Side::Client, Side::Server]);

    let key_exchange = session.events().of_kind(EventKind::KeyExchange).next().unwrap();
    let mut ops = session.crypto().for_event(key_exchange.ordinal).map(|e| e.operation);
    assert!(ops.any(|op| op == CryptoOp::Kdf));
}

#[test]
fn advance_after_terminal_is_rejected() {
    let mut session = run(EndpointPolicy::default(), server_with(RSA));
    let before = session.events().len();
    assert!(session.advance().is_err());
    assert!(session.run_to_completion().is_err());
    assert_eq!(session.events().len(), before);
}

#[test]
fn stepping_visits_every_state() {
    let mut session =
        Session::new(EndpointPolicy::default(), server_with(RSA), FixedKeys::from_seed(1));
    assert_eq!(session.state(), HandshakeState::Init);

    let mut states = Vec::new();
    while !session.state().is_terminal() {
        states.push(session.advance().unwrap());
    }
    assert_eq!(
        states,
        [
            HandshakeState::ClientHelloSent,
            HandshakeState::ServerHelloSent,
            HandshakeState::KeyExchangeDone,
            HandshakeState::CertificateExchange,
            HandshakeState::Established,
        ]
    );
}

#[test]
fn scripted_interaction_delivers_both_ways() {
    let mut simulator =
        Simulator::new(EndpointPolicy::default(), server_with(RSA), FixedKeys::from_seed(5));
    let script = Command::full_interaction("ping", "pong");
    let record = simulator.run_full_interaction(&script).unwrap().clone();

    assert!(record.success);
    assert!(record.app_data_bytes > 0);
    assert!(simulator.session().is_closed());
    let received: Vec<&str> = simulator
        .session()
        .events()
        .of_kind(EventKind::MessageReceived)
        .map(|e| e.summary.as_str())
        .collect();
    assert_eq!(received, ["Received: ping", "Received: pong"]);
}

fn forced_keys(seed: u64) -> FixedKeys {
    FixedKeys::from_seed(seed)
        .with_override(Side::Client, KeyPurpose::Ephemeral, [0x42])
        .with_override(Side::Server, KeyPurpose::Ephemeral, [0x43])
}

fn key_exchange_outputs(session: &Session<FixedKeys>) -> Vec<(CryptoOp, Side, String)> {
    session
        .crypto()
        .iter()
        .filter(|e| matches!(e.operation, CryptoOp::Keygen | CryptoOp::Ecdh))
        .map(|e| (e.operation, e.side, e.outputs.clone()))
        .collect()
}

#[test]
fn forced_ephemeral_keys_reach_the_keygen_trace() {
    let start = |keys| {
        let mut session = Session::new(EndpointPolicy::default(), server_with(RSA), keys);
        session.run_to_completion().unwrap();
        session
    };

    let forced = start(forced_keys(1));
    let expected = KeyPair::generate(KeyExchangeGroup::X25519, &[0x42; 32]);
    let client_keygen = forced.crypto().by_operation(CryptoOp::Keygen).next().unwrap();
    assert_eq!(client_keygen.side, Side::Client);
    assert!(
        client_keygen.outputs.contains(&hex::encode(&expected.public()[..8])),
        "{}",
        client_keygen.outputs
    );

    // other seeds change the hello randoms but not the forced key exchange
    let reseeded = start(forced_keys(2));
    assert_eq!(key_exchange_outputs(&forced), key_exchange_outputs(&reseeded));
    assert_ne!(forced.events().get(1), reseeded.events().get(1));

    let unforced = start(FixedKeys::from_seed(1));
    assert_ne!(key_exchange_outputs(&forced), key_exchange_outputs(&unforced));
}
