//! Usage violations around the record layer.
//!
//! Every misuse must surface as a `SessionError` and leave the logs untouched.

use tlsim_core::{CryptoOp, EventKind, FixedKeys, HandshakeState, Session, SessionError, Side};
use tlsim_proto::{
    CipherSuite, EndpointPolicy, RecordType, RsaKeySize, SignatureAlgorithm, SignatureIdentity,
};

fn session() -> Session<FixedKeys> {
    let identity = SignatureIdentity::new(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048));
    let server = EndpointPolicy::builder().identity(identity).build();
    Session::new(EndpointPolicy::default(), server, FixedKeys::from_seed(9))
}

fn established() -> Session<FixedKeys> {
    let mut session = session();
    assert!(session.run_to_completion().unwrap().is_established());
    session
}

#[test]
fn send_before_handshake() {
    let mut session = session();
    session.advance().unwrap();

    let err = session.send(Side::Client, b"early").unwrap_err();
    assert_eq!(
        err,
        SessionError::SessionNotEstablished {
            state: HandshakeState::ClientHelloSent,
            operation: "send"
        }
    );
    assert_eq!(err.to_string(), "session not established: cannot send in CLIENT_HELLO_SENT");
    assert!(matches!(session.receive(), Err(SessionError::SessionNotEstablished { .. })));
    assert!(matches!(
        session.close(Side::Server),
        Err(SessionError::SessionNotEstablished { .. })
    ));
    assert_eq!(session.events().len(), 2);
}

#[test]
fn failed_session_has_no_transport() {
    let mut session = Session::new(
        EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build(),
        EndpointPolicy::builder().cipher_suites([CipherSuite::Aes256GcmSha384]).build(),
        FixedKeys::from_seed(1),
    );
    assert!(!session.run_to_completion().unwrap().is_established());

    let before = session.events().len();
    assert!(matches!(
        session.send(Side::Client, b"x"),
        Err(SessionError::SessionNotEstablished { state: HandshakeState::Failed, .. })
    ));
    assert_eq!(session.events().len(), before);
}

#[test]
fn receive_with_nothing_in_flight() {
    let mut session = established();
    assert_eq!(session.receive(), Err(SessionError::NothingInFlight));
}

#[test]
fn close_is_terminal() {
    let mut session = established();
    session.send(Side::Server, b"bye").unwrap();
    session.close(Side::Server).unwrap();
    assert!(session.is_closed());
    let before = session.events().len();

    assert!(matches!(session.send(Side::Client, b"late"), Err(SessionError::InvalidState { .. })));
    assert!(matches!(session.receive(), Err(SessionError::InvalidState { .. })));
    assert!(matches!(session.close(Side::Client), Err(SessionError::InvalidState { .. })));

    assert_eq!(session.events().len(), before);
    assert_eq!(session.events().last().map(|e| e.kind), Some(EventKind::CloseNotify));
    assert_eq!(session.in_flight(), 1);
}

#[test]
fn messages_arrive_in_send_order() {
    let mut session = established();
    session.send(Side::Client, b"first").unwrap();
    session.send(Side::Server, b"second").unwrap();
    session.send(Side::Client, b"third").unwrap();
    assert_eq!(session.in_flight(), 3);

    let deliveries: Vec<(Side, Vec<u8>)> = (0..3)
        .map(|_| session.receive().map(|d| (d.to, d.plaintext)))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        deliveries,
        [
            (Side::Server, b"first".to_vec()),
            (Side::Client, b"second".to_vec()),
            (Side::Server, b"third".to_vec()),
        ]
    );
}

#[test]
fn packets_show_both_views_of_a_message() {
    let mut session = established();
    let sent = session.send(Side::Client, b"hello").unwrap();
    session.receive().unwrap();

    assert_eq!(sent.record_type, RecordType::ApplicationData);
    assert_eq!(sent.records, [5 + 1 + 16]);

    let views: Vec<_> = session
        .packets()
        .iter()
        .filter(|p| p.record_type == RecordType::ApplicationData)
        .map(|p| (p.sender, p.observation))
        .collect();
    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|(sender, _)| *sender == Side::Client));
    assert_eq!(session.packets().sent_bytes(RecordType::ApplicationData), sent.wire_len());
}

#[test]
fn every_crypto_entry_points_at_an_event() {
    let mut session = established();
    session.send(Side::Client, b"one").unwrap();
    session.receive().unwrap();
    session.close(Side::Client).unwrap();

    let events = session.events();
    assert!(session.crypto().iter().all(|entry| events.get(entry.event).is_some()));
    assert!(session.packets().iter().all(|packet| events.get(packet.event).is_some()));
    assert_eq!(session.crypto().by_operation(CryptoOp::AeadEncrypt).count(), 2);
    assert_eq!(session.crypto().by_operation(CryptoOp::AeadDecrypt).count(), 1);
}
