//! Scenario tests over the bundled presets and scripted interactions.
//!
//! Every scenario also runs the standard invariants before its oracles.

use tlsim_core::{Command, EventKind, FailureReason, SessionError, Side, presets};
use tlsim_harness::Scenario;
use tlsim_proto::{CipherSuite, EndpointPolicy, RsaKeySize, SignatureAlgorithm, SignatureIdentity};

fn rsa_server() -> EndpointPolicy {
    let identity = SignatureIdentity::new(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048));
    EndpointPolicy::builder().identity(identity).build()
}

#[test]
fn every_preset_completes_a_full_interaction() {
    for preset in presets::all() {
        let id = preset.id;
        let result = Scenario::new()
            .client(preset.client)
            .server(preset.server)
            .script(Command::full_interaction("ping", "pong"))
            .oracle(Box::new(move |world| {
                if !world.outcome().is_some_and(|o| o.is_established()) {
                    return Err(format!("{id}: {:?}", world.outcome()));
                }
                assert!(world.session().is_closed(), "{id}");
                assert_eq!(world.deliveries().len(), 2, "{id}");
                Ok(())
            }))
            .run();

        assert!(result.is_ok(), "{result:?}");
    }
}

#[test]
fn full_interaction_flow() {
    let result = Scenario::new()
        .server(rsa_server())
        .script(Command::full_interaction("hi", "hello"))
        .oracle(Box::new(|world| {
            insta::assert_snapshot!(
                world.flow(),
                @"init client_hello server_hello key_exchange certificate_verify finished finished negotiation_result message_sent message_received message_sent message_received close_notify"
            );
            let delivered: Vec<_> =
                world.deliveries().iter().map(|d| (d.to, d.plaintext.as_slice())).collect();
            assert_eq!(delivered, [(Side::Server, &b"hi"[..]), (Side::Client, &b"hello"[..])]);
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn failed_handshake_skips_the_script() {
    let result = Scenario::new()
        .client(EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build())
        .server(rsa_server().with_cipher_suites([CipherSuite::Chacha20Poly1305Sha256]))
        .script(Command::full_interaction("hi", "hello"))
        .oracle(Box::new(|world| {
            let failure = world.outcome().and_then(|o| o.failure());
            assert_eq!(failure, Some(FailureReason::NoCommonCipherSuite));
            assert!(world.deliveries().is_empty());
            assert!(world.script_error().is_none());
            assert!(!world.kinds().contains(&EventKind::MessageSent));
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn commands_after_disconnect_stop_the_script() {
    let script = vec![
        Command::ServerSend("first".to_string()),
        Command::ServerDisconnect,
        Command::ClientSend("too late".to_string()),
    ];
    let result = Scenario::new()
        .server(rsa_server())
        .script(script)
        .oracle(Box::new(|world| {
            assert_eq!(world.deliveries().len(), 1);
            assert!(matches!(world.script_error(), Some(SessionError::InvalidState { .. })));
            assert_eq!(world.kinds().last(), Some(&EventKind::CloseNotify));
            Ok(())
        }))
        .run();

    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn oracle_errors_surface() {
    let result = Scenario::new()
        .server(rsa_server())
        .oracle(Box::new(|_| Ok(())))
        .oracle(Box::new(|world| Err(format!("{} events", world.kinds().len()))))
        .run();

    assert_eq!(result, Err("8 events".to_string()));
}
