//! Model-based tests for the session API.
//!
//! Random operation sequences are applied to a [`ModelSession`] and to a real
//! session. Every result must match, and the standard invariants must hold
//! after every step.

use proptest::prelude::*;
use tlsim_core::{FixedKeys, Session};
use tlsim_harness::{
    Endpoint, InvariantRegistry, ModelSession, Operation, RunSnapshot, SmallMessage,
    apply_to_session,
};
use tlsim_proto::{
    CipherSuite, ClientAuth, EndpointPolicy, KeyExchangeGroup, RsaKeySize, SignatureAlgorithm,
    SignatureIdentity,
};

fn server() -> EndpointPolicy {
    let identity = SignatureIdentity::new(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048));
    EndpointPolicy::builder().identity(identity).groups(KeyExchangeGroup::ALL).build()
}

/// Policy pairs with the advance on which their handshake fails.
fn setups() -> Vec<(EndpointPolicy, EndpointPolicy, Option<usize>)> {
    let mlkem = EndpointPolicy::builder().groups([KeyExchangeGroup::MlKem768]).build();
    let aes128 = EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build();
    let anonymous_server = EndpointPolicy::default();

    vec![
        (EndpointPolicy::default(), server(), None),
        (mlkem, server(), None),
        (aes128, server().with_cipher_suites([CipherSuite::Aes256GcmSha384]), Some(2)),
        (EndpointPolicy::default(), server().with_client_auth(ClientAuth::Require), Some(2)),
        (EndpointPolicy::default(), anonymous_server, Some(4)),
    ]
}

fn endpoint() -> impl Strategy<Value = Endpoint> {
    prop_oneof![Just(Endpoint::Client), Just(Endpoint::Server)]
}

fn message() -> impl Strategy<Value = SmallMessage> {
    (any::<u8>(), any::<u8>()).prop_map(|(seed, size_class)| SmallMessage { seed, size_class })
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        // Weight towards reaching the data phase
        4 => Just(Operation::Advance),
        4 => (endpoint(), message()).prop_map(|(from, message)| Operation::Send { from, message }),
        3 => Just(Operation::Receive),
        1 => endpoint().prop_map(|from| Operation::Close { from }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_model_matches_real(
        setup in 0..5usize,
        seed in any::<u64>(),
        operations in prop::collection::vec(operation(), 0..40),
    ) {
        let (client, server, fails_after) = setups().swap_remove(setup);
        let mut session = Session::new(client, server, FixedKeys::from_seed(seed));
        let mut model = ModelSession::new(fails_after);
        let registry = InvariantRegistry::standard();

        for (step, operation) in operations.iter().enumerate() {
            let expected = model.apply(operation);
            let actual = apply_to_session(&mut session, operation);
            prop_assert_eq!(&actual, &expected, "step {} {:?}", step, operation);
            prop_assert_eq!(session.state(), model.state());
            prop_assert_eq!(session.in_flight(), model.in_flight());

            let snapshot = RunSnapshot::from_session(&session);
            if let Err(violations) = registry.check_all(&snapshot) {
                prop_assert!(false, "step {} {:?}: {:?}", step, operation, violations);
            }
        }
    }
}

#[test]
fn setups_end_as_declared() {
    for (client, server, fails_after) in setups() {
        let mut session = Session::new(client, server, FixedKeys::from_seed(0));
        let mut advances = 0;
        while !session.advance().unwrap().is_terminal() {
            advances += 1;
        }
        advances += 1;

        match fails_after {
            None => assert!(session.is_established()),
            Some(expected) => {
                assert!(!session.is_established());
                assert_eq!(advances, expected);
            },
        }
    }
}
