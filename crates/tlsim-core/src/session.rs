//! Sessions and the simulator that replaces them.
//!
//! A [`Session`] owns one run: the policies it was built from, its key source,
//! the event log, the crypto trace, the packet log and, once terminal, the
//! negotiation result. Nothing in a session is reset in place. A
//! [`Simulator`] swaps the whole session for a fresh one and keeps a
//! [`RunRecord`] of each finished run.

use tlsim_proto::EndpointPolicy;

use crate::{
    env::KeySource,
    error::SessionError,
    event::{EventKind, EventLog, Side},
    handshake::{Context, Handshake, HandshakeState, Step},
    journal::Journal,
    negotiation::NegotiationResult,
    report::RunRecord,
    script::Command,
    trace::CryptoRecorder,
    transport::{Delivery, Transport},
    wire::{PacketLog, WirePacket},
};

/// One negotiation and the traffic that follows it.
#[derive(Debug)]
pub struct Session<K: KeySource> {
    client: EndpointPolicy,
    server: EndpointPolicy,
    keys: K,
    journal: Journal,
    handshake: Handshake,
    outcome: Option<NegotiationResult>,
    transport: Option<Transport>,
}

impl<K: KeySource> Session<K> {
    /// Create a session and append its `init` event.
    pub fn new(client: EndpointPolicy, server: EndpointPolicy, keys: K) -> Self {
        let mut journal = Journal::default();
        let summary = "TLS 1.3 session created".to_string();
        journal.emit(EventKind::Init, Side::Connection, summary, None);
        Self {
            client,
            server,
            keys,
            journal,
            handshake: Handshake::new(),
            outcome: None,
            transport: None,
        }
    }

    /// Perform one handshake transition and return the state reached.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if the handshake is already terminal
    /// - `SessionError::Crypto` if a primitive fails
    pub fn advance(&mut self) -> Result<HandshakeState, SessionError> {
        let ctx = Context {
            client: &self.client,
            server: &self.server,
            keys: &mut self.keys,
            journal: &mut self.journal,
        };
        match self.handshake.advance(ctx)? {
            Step::Continue => {},
            Step::Established(result, transport) => {
                self.outcome = Some(result);
                self.transport = Some(transport);
            },
            Step::Failed(result) => self.outcome = Some(result),
        }
        Ok(self.handshake.state())
    }

    /// Advance until the handshake is terminal.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if the handshake was already terminal
    /// - `SessionError::Crypto` if a primitive fails
    pub fn run_to_completion(&mut self) -> Result<&NegotiationResult, SessionError> {
        loop {
            if self.advance()?.is_terminal() {
                break;
            }
        }
        self.outcome.as_ref().ok_or(SessionError::InvalidState {
            state: self.handshake.state(),
            operation: "read outcome".to_string(),
        })
    }

    /// Encrypt and send application data from `from`.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionNotEstablished` before the handshake completed
    /// - `SessionError::InvalidState` after `close_notify`
    /// - `SessionError::InvalidSide` if `from` is not an endpoint
    pub fn send(&mut self, from: Side, plaintext: &[u8]) -> Result<WirePacket, SessionError> {
        let transport = Self::transport_of(&mut self.transport, self.handshake.state(), "send")?;
        transport.send(&mut self.journal, from, plaintext)
    }

    /// Deliver the oldest message in flight to its receiver.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionNotEstablished` before the handshake completed
    /// - `SessionError::InvalidState` after `close_notify`
    /// - `SessionError::NothingInFlight` if nothing was sent
    /// - `SessionError::Crypto` if a record fails to authenticate
    pub fn receive(&mut self) -> Result<Delivery, SessionError> {
        let transport = Self::transport_of(&mut self.transport, self.handshake.state(), "receive")?;
        transport.receive(&mut self.journal)
    }

    /// Send `close_notify` from `from`. The session accepts no traffic after.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionNotEstablished` before the handshake completed
    /// - `SessionError::InvalidState` on a second close
    /// - `SessionError::InvalidSide` if `from` is not an endpoint
    pub fn close(&mut self, from: Side) -> Result<(), SessionError> {
        let transport = Self::transport_of(&mut self.transport, self.handshake.state(), "close")?;
        transport.close(&mut self.journal, from)
    }

    fn transport_of<'t>(
        transport: &'t mut Option<Transport>,
        state: HandshakeState,
        operation: &'static str,
    ) -> Result<&'t mut Transport, SessionError> {
        transport.as_mut().ok_or(SessionError::SessionNotEstablished { state, operation })
    }

    /// Run post-handshake commands. A send command is followed by the peer's
    /// receive.
    ///
    /// # Errors
    ///
    /// Any error of [`Session::send`], [`Session::receive`] or
    /// [`Session::close`]. Commands after the failing one are not run.
    pub fn run_script(&mut self, commands: &[Command]) -> Result<Vec<Delivery>, SessionError> {
        let mut deliveries = Vec::new();
        for command in commands {
            match command {
                Command::ClientSend(message) | Command::ServerSend(message) => {
                    self.send(command.actor(), message.as_bytes())?;
                    deliveries.push(self.receive()?);
                },
                Command::ClientDisconnect | Command::ServerDisconnect => {
                    self.close(command.actor())?;
                },
            }
        }
        Ok(deliveries)
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// Terminal result, once reached.
    pub fn outcome(&self) -> Option<&NegotiationResult> {
        self.outcome.as_ref()
    }

    /// `true` once the handshake established.
    pub fn is_established(&self) -> bool {
        self.transport.is_some()
    }

    /// `true` once either side sent `close_notify`.
    pub fn is_closed(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_closed)
    }

    /// Messages sent but not yet received.
    pub fn in_flight(&self) -> usize {
        self.transport.as_ref().map_or(0, Transport::in_flight)
    }

    /// Protocol events.
    pub fn events(&self) -> &EventLog {
        self.journal.events()
    }

    /// Crypto operation trace.
    pub fn crypto(&self) -> &CryptoRecorder {
        self.journal.crypto_trace()
    }

    /// Simulated wire packets.
    pub fn packets(&self) -> &PacketLog {
        self.journal.packets()
    }

    /// Client policy this session runs with.
    pub fn client_policy(&self) -> &EndpointPolicy {
        &self.client
    }

    /// Server policy this session runs with.
    pub fn server_policy(&self) -> &EndpointPolicy {
        &self.server
    }

    /// Key source, as consumed so far.
    pub fn keys(&self) -> &K {
        &self.keys
    }
}

/// Owns the current session and the history of finished runs.
#[derive(Debug)]
pub struct Simulator<K: KeySource + Clone> {
    client: EndpointPolicy,
    server: EndpointPolicy,
    keys: K,
    session: Session<K>,
    recorded: bool,
    history: Vec<RunRecord>,
}

impl<K: KeySource + Clone> Simulator<K> {
    /// Simulator with a fresh session. Each new session gets a clone of
    /// `keys` as it is now.
    pub fn new(client: EndpointPolicy, server: EndpointPolicy, keys: K) -> Self {
        let session = Session::new(client.clone(), server.clone(), keys.clone());
        Self { client, server, keys, session, recorded: false, history: Vec::new() }
    }

    /// Current session.
    pub fn session(&self) -> &Session<K> {
        &self.session
    }

    /// Current session, for stepping and traffic.
    pub fn session_mut(&mut self) -> &mut Session<K> {
        &mut self.session
    }

    /// Replace the current session with a fresh one. A session that reached
    /// a terminal state is recorded first, unless it already was.
    pub fn reset(&mut self) {
        if self.session.state().is_terminal() {
            self.record_current();
        }
        self.session = Session::new(self.client.clone(), self.server.clone(), self.keys.clone());
        self.recorded = false;
        tracing::debug!(runs = self.history.len(), "session reset");
    }

    /// Switch to new policies and reset.
    pub fn reconfigure(&mut self, client: EndpointPolicy, server: EndpointPolicy) {
        self.client = client;
        self.server = server;
        self.reset();
    }

    /// Reset, run the handshake and, if it established, the script. The run
    /// is recorded whether or not it established, and stays available
    /// through [`Simulator::session`] until the next reset.
    ///
    /// # Errors
    ///
    /// Any error of [`Session::run_to_completion`] or [`Session::run_script`].
    /// The run is still recorded.
    pub fn run_full_interaction(
        &mut self,
        commands: &[Command],
    ) -> Result<&RunRecord, SessionError> {
        self.reset();
        let result = self.drive(commands);
        let record = self.record_current();
        result.map(|()| record)
    }

    fn drive(&mut self, commands: &[Command]) -> Result<(), SessionError> {
        if self.session.run_to_completion()?.is_established() {
            self.session.run_script(commands)?;
        }
        Ok(())
    }

    /// Record the current session in the history. Recording the same session
    /// twice returns the existing record.
    pub fn record_current(&mut self) -> &RunRecord {
        if !self.recorded {
            let session = &self.session;
            let record = RunRecord::new(
                self.history.len() as u64 + 1,
                session.client_policy(),
                session.server_policy(),
                session.outcome(),
                session.packets(),
            );
            tracing::info!(
                id = record.id,
                success = record.success,
                bytes = record.total_bytes,
                "run recorded"
            );
            self.history.push(record);
            self.recorded = true;
        }
        let Some(record) = self.history.last() else {
            unreachable!("current session was just recorded");
        };
        record
    }

    /// Records of finished runs, oldest first.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    /// Client policy for new sessions.
    pub fn client_policy(&self) -> &EndpointPolicy {
        &self.client
    }

    /// Server policy for new sessions.
    pub fn server_policy(&self) -> &EndpointPolicy {
        &self.server
    }
}
