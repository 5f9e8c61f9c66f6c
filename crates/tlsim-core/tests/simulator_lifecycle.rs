//! Simulator reset and history across several runs.

use tlsim_core::{Command, EventKind, FailureReason, FixedKeys, HandshakeState, Simulator};
use tlsim_proto::{EndpointPolicy, KeyExchangeGroup};

fn assert_fresh(simulator: &Simulator<FixedKeys>) {
    let session = simulator.session();
    assert_eq!(session.state(), HandshakeState::Init);
    assert_eq!(session.events().kinds(), [EventKind::Init]);
    assert!(session.crypto().is_empty());
    assert!(session.packets().is_empty());
    assert!(session.outcome().is_none());
}

#[test]
fn run_reset_reconfigure_run() {
    let mut simulator = Simulator::new(
        EndpointPolicy::default(),
        EndpointPolicy::default_server(),
        FixedKeys::from_seed(3),
    );
    assert_fresh(&simulator);
    assert!(simulator.history().is_empty());

    // a terminal session that nobody recorded is archived by the reset
    simulator.session_mut().run_to_completion().unwrap();
    simulator.reset();
    assert_fresh(&simulator);
    assert_eq!(simulator.history().len(), 1);
    assert!(simulator.history()[0].success);

    // an untouched session is not archived
    simulator.reset();
    assert_eq!(simulator.history().len(), 1);

    let script = Command::full_interaction("ping", "pong");
    let second = simulator.run_full_interaction(&script).unwrap().clone();
    assert_eq!(second.id, 2);
    assert!(second.app_data_bytes > 0);

    // recording the same session again hands back the existing record
    assert_eq!(simulator.record_current(), &second);
    assert_eq!(simulator.history().len(), 2);

    let anonymous = EndpointPolicy::default();
    let client = EndpointPolicy::default().with_groups([KeyExchangeGroup::P384]);
    simulator.reconfigure(client.clone(), anonymous.clone());
    assert_fresh(&simulator);
    assert_eq!(simulator.history().len(), 2);
    assert_eq!(simulator.session().client_policy(), &client);
    assert_eq!(simulator.session().server_policy(), &anonymous);

    let third = simulator.run_full_interaction(&script).unwrap().clone();
    assert!(!third.success);
    assert_eq!(third.failure, Some(FailureReason::ServerCertificateAbsent));
    assert_eq!(third.key_exchange, None);
    assert_eq!(third.server_identity, None);
    let key_exchanges = simulator.session().events().of_kind(EventKind::KeyExchange).count();
    assert_eq!(key_exchanges, 1);

    let ids: Vec<u64> = simulator.history().iter().map(|record| record.id).collect();
    assert_eq!(ids, [1, 2, 3]);
}

#[test]
fn each_session_replays_the_same_keys() {
    let mut simulator = Simulator::new(
        EndpointPolicy::default(),
        EndpointPolicy::default_server(),
        FixedKeys::from_seed(11),
    );

    simulator.run_full_interaction(&[]).unwrap();
    let first: Vec<String> =
        simulator.session().crypto().iter().map(|e| e.outputs.clone()).collect();

    simulator.run_full_interaction(&[]).unwrap();
    let second: Vec<String> =
        simulator.session().crypto().iter().map(|e| e.outputs.clone()).collect();

    assert_eq!(first, second);
    assert_eq!(simulator.history()[0].total_bytes, simulator.history()[1].total_bytes);
}
