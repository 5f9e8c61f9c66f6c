//! Observable state of a session at one point in time.
//!
//! Snapshots own their data so a check can run after the session is gone or
//! has moved on. They are built from the public accessors only.

use serde::Serialize;
use tlsim_core::{
    CryptoTraceEntry, EventKind, HandshakeState, KeySource, NegotiationResult, ProtocolEvent,
    Session, WirePacket,
};

/// Copy of every log and status flag of a session.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    /// Handshake state when the snapshot was taken
    pub state: HandshakeState,
    /// Handshake outcome, once terminal
    pub outcome: Option<NegotiationResult>,
    /// `true` once `close_notify` was sent
    pub closed: bool,
    /// Records sent but not yet received
    pub in_flight: usize,
    /// Protocol events in order
    pub events: Vec<ProtocolEvent>,
    /// Crypto trace in order
    pub crypto: Vec<CryptoTraceEntry>,
    /// Wire packets in order
    pub packets: Vec<WirePacket>,
}

impl RunSnapshot {
    /// Snapshot of a session that has done nothing.
    pub fn empty() -> Self {
        Self {
            state: HandshakeState::Init,
            outcome: None,
            closed: false,
            in_flight: 0,
            events: Vec::new(),
            crypto: Vec::new(),
            packets: Vec::new(),
        }
    }

    /// Capture `session`.
    pub fn from_session<K: KeySource>(session: &Session<K>) -> Self {
        Self {
            state: session.state(),
            outcome: session.outcome().cloned(),
            closed: session.is_closed(),
            in_flight: session.in_flight(),
            events: session.events().as_slice().to_vec(),
            crypto: session.crypto().iter().cloned().collect(),
            packets: session.packets().iter().cloned().collect(),
        }
    }

    /// Event kinds in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Number of events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Position of the first event of `kind`.
    pub fn first(&self, kind: EventKind) -> Option<usize> {
        self.events.iter().position(|e| e.kind == kind)
    }

    /// `true` when the handshake ended established.
    pub fn is_established(&self) -> bool {
        self.outcome.as_ref().is_some_and(NegotiationResult::is_established)
    }
}
