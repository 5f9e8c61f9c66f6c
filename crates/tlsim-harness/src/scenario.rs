//! Scenario builder for end-to-end session tests.
//!
//! A scenario runs one seeded session to completion, plays a script of
//! post-handshake commands, checks the standard invariants and then hands the
//! finished [`World`] to each oracle.
//!
//! ```ignore
//! let result = Scenario::new()
//!     .server(server_policy)
//!     .script(Command::full_interaction("hi", "hello"))
//!     .oracle(Box::new(|world| {
//!         assert!(world.session().is_closed());
//!         Ok(())
//!     }))
//!     .run();
//! assert!(result.is_ok());
//! ```

use tlsim_core::{
    Command, Delivery, EventKind, FixedKeys, NegotiationResult, Session, SessionError,
};
use tlsim_proto::EndpointPolicy;

use crate::invariants::{InvariantRegistry, RunSnapshot};

/// Check run against the finished world.
pub type Oracle = Box<dyn FnOnce(&World) -> Result<(), String>>;

/// Finished session plus what the script produced.
pub struct World {
    session: Session<FixedKeys>,
    deliveries: Vec<Delivery>,
    script_error: Option<SessionError>,
}

impl World {
    /// The session after the script ran.
    pub fn session(&self) -> &Session<FixedKeys> {
        &self.session
    }

    /// Handshake outcome.
    pub fn outcome(&self) -> Option<&NegotiationResult> {
        self.session.outcome()
    }

    /// Messages delivered by the script, in order.
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Error that stopped the script, if any.
    pub fn script_error(&self) -> Option<&SessionError> {
        self.script_error.as_ref()
    }

    /// Event kinds in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.session.events().kinds()
    }

    /// Event kinds joined with spaces, for inline snapshots.
    pub fn flow(&self) -> String {
        self.kinds().iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" ")
    }
}

/// Builder for a single seeded session run.
pub struct Scenario {
    client: EndpointPolicy,
    server: EndpointPolicy,
    seed: u64,
    script: Vec<Command>,
    invariants: InvariantRegistry,
    oracles: Vec<Oracle>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Default client, default server with the bundled certificate, seed 0,
    /// no script.
    pub fn new() -> Self {
        Self {
            client: EndpointPolicy::default(),
            server: EndpointPolicy::default_server(),
            seed: 0,
            script: Vec::new(),
            invariants: InvariantRegistry::standard(),
            oracles: Vec::new(),
        }
    }

    /// Client policy.
    #[must_use]
    pub fn client(mut self, policy: EndpointPolicy) -> Self {
        self.client = policy;
        self
    }

    /// Server policy.
    #[must_use]
    pub fn server(mut self, policy: EndpointPolicy) -> Self {
        self.server = policy;
        self
    }

    /// Seed for [`FixedKeys`].
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Commands to play once the handshake established.
    #[must_use]
    pub fn script(mut self, commands: Vec<Command>) -> Self {
        self.script = commands;
        self
    }

    /// Replace the invariant registry.
    #[must_use]
    pub fn invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = registry;
        self
    }

    /// Add an oracle. Oracles run in insertion order after the invariants.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Run the handshake, the script, the invariants and the oracles.
    ///
    /// The script is skipped when the handshake fails.
    ///
    /// # Errors
    ///
    /// - Engine errors while driving the handshake
    /// - Every invariant violation, joined
    /// - The first oracle error
    pub fn run(self) -> Result<(), String> {
        let mut session = Session::new(self.client, self.server, FixedKeys::from_seed(self.seed));
        let established = session
            .run_to_completion()
            .map_err(|err| format!("handshake: {err}"))?
            .is_established();

        let mut deliveries = Vec::new();
        let mut script_error = None;
        if established {
            for command in &self.script {
                match session.run_script(std::slice::from_ref(command)) {
                    Ok(mut delivered) => deliveries.append(&mut delivered),
                    Err(err) => {
                        tracing::debug!(%err, ?command, "script stopped");
                        script_error = Some(err);
                        break;
                    },
                }
            }
        }

        let snapshot = RunSnapshot::from_session(&session);
        if let Err(violations) = self.invariants.check_all(&snapshot) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            return Err(messages.join("; "));
        }

        let world = World { session, deliveries, script_error };
        for oracle in self.oracles {
            oracle(&world)?;
        }
        Ok(())
    }
}
