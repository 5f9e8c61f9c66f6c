//! Fuzz target for the session API against its reference model
//!
//! # Strategy
//!
//! - Policies: one of a fixed set of establishing and failing pairs
//! - Operations: arbitrary advance/send/receive/close sequences
//!
//! # Invariants
//!
//! - Every call returns what the model predicts
//! - The standard log invariants hold after every call
//! - NEVER panic inside the engine

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tlsim_core::{FixedKeys, Session};
use tlsim_harness::{InvariantRegistry, ModelSession, Operation, RunSnapshot, apply_to_session};
use tlsim_proto::{
    CipherSuite, ClientAuth, EndpointPolicy, KeyExchangeGroup, MlDsaLevel, SignatureAlgorithm,
    SignatureIdentity,
};

#[derive(Debug, Arbitrary)]
enum Setup {
    Classical,
    PostQuantum,
    NoCommonSuite,
    MissingClientCertificate,
    AnonymousServer,
}

#[derive(Debug, Arbitrary)]
struct Input {
    setup: Setup,
    seed: u64,
    operations: Vec<Operation>,
}

fn policies(setup: &Setup) -> (EndpointPolicy, EndpointPolicy, Option<usize>) {
    let mldsa = SignatureAlgorithm::MlDsa(MlDsaLevel::MlDsa44);
    let server = EndpointPolicy::builder()
        .groups(KeyExchangeGroup::ALL)
        .identity(SignatureIdentity::new(mldsa))
        .build();

    match setup {
        Setup::Classical => (EndpointPolicy::default(), server, None),
        Setup::PostQuantum => {
            let client = EndpointPolicy::builder().groups([KeyExchangeGroup::MlKem768]).build();
            (client, server, None)
        },
        Setup::NoCommonSuite => {
            let client =
                EndpointPolicy::builder().cipher_suites([CipherSuite::Aes128GcmSha256]).build();
            (client, server.with_cipher_suites([CipherSuite::Aes256GcmSha384]), Some(2))
        },
        Setup::MissingClientCertificate => {
            (EndpointPolicy::default(), server.with_client_auth(ClientAuth::Require), Some(2))
        },
        Setup::AnonymousServer => (EndpointPolicy::default(), EndpointPolicy::default(), Some(4)),
    }
}

fuzz_target!(|input: Input| {
    let (client, server, fails_after) = policies(&input.setup);
    let mut session = Session::new(client, server, FixedKeys::from_seed(input.seed));
    let mut model = ModelSession::new(fails_after);
    let registry = InvariantRegistry::standard();

    for operation in input.operations.iter().take(64) {
        let expected = model.apply(operation);
        let actual = apply_to_session(&mut session, operation);
        assert_eq!(actual, expected, "{operation:?}");

        registry.assert_all(&RunSnapshot::from_session(&session), "after operation");
    }
});
