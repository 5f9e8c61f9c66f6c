//! Protocol event log.
//!
//! One [`ProtocolEvent`] per protocol step, appended in order with a strictly
//! increasing ordinal. The log is append-only: nothing outside the crate can
//! push, and nothing can remove or reorder an entry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Session created
    Init,
    /// Client offered suites, groups, signature schemes and a key share
    ClientHello,
    /// Server selected a suite and group
    ServerHello,
    /// Both sides derived the shared secret
    KeyExchange,
    /// An endpoint presented its certificate chain and signature
    CertificateVerify,
    /// An endpoint confirmed the transcript
    Finished,
    /// Application data encrypted and put in flight
    MessageSent,
    /// Application data delivered and decrypted
    MessageReceived,
    /// Orderly shutdown alert
    CloseNotify,
    /// Final negotiation outcome
    NegotiationResult,
}

impl EventKind {
    /// Wire name (`client_hello`, `close_notify`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ClientHello => "client_hello",
            Self::ServerHello => "server_hello",
            Self::KeyExchange => "key_exchange",
            Self::CertificateVerify => "certificate_verify",
            Self::Finished => "finished",
            Self::MessageSent => "message_sent",
            Self::MessageReceived => "message_received",
            Self::CloseNotify => "close_notify",
            Self::NegotiationResult => "negotiation_result",
        }
    }

    /// Events that belong to the handshake rather than the data phase.
    pub fn is_handshake_phase(self) -> bool {
        !matches!(self, Self::MessageSent | Self::MessageReceived | Self::CloseNotify)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which party an event or operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The client endpoint
    Client,
    /// The server endpoint
    Server,
    /// The connection as a whole (key schedule, outcome)
    Connection,
}

impl Side {
    /// The other endpoint. `Connection` has no peer and maps to itself.
    pub fn peer(self) -> Self {
        match self {
            Self::Client => Self::Server,
            Self::Server => Self::Client,
            Self::Connection => Self::Connection,
        }
    }

    /// `true` for the two endpoints.
    pub fn is_endpoint(self) -> bool {
        !matches!(self, Self::Connection)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::Connection => "connection",
        })
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    /// Position in the log, starting at 0
    pub ordinal: u64,
    /// Step kind
    pub kind: EventKind,
    /// Acting side
    pub side: Side,
    /// Human-readable detail
    pub summary: String,
    /// Plaintext bytes carried on the wire; `None` for local events
    pub payload_len: Option<usize>,
}

/// Append-only, ordered event log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
}

impl EventLog {
    /// Ordinal the next appended event will get.
    pub fn next_ordinal(&self) -> u64 {
        self.events.len() as u64
    }

    pub(crate) fn push(
        &mut self,
        kind: EventKind,
        side: Side,
        summary: String,
        payload_len: Option<usize>,
    ) -> &ProtocolEvent {
        let ordinal = self.next_ordinal();
        tracing::debug!(ordinal, event = %kind, %side, %summary, "event");
        self.events.push(ProtocolEvent { ordinal, kind, side, summary, payload_len });
        &self.events[self.events.len() - 1]
    }

    /// Event at `ordinal`.
    pub fn get(&self, ordinal: u64) -> Option<&ProtocolEvent> {
        usize::try_from(ordinal).ok().and_then(|i| self.events.get(i))
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// `true` before `init` is appended.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in order.
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolEvent> {
        self.events.iter()
    }

    /// All events as a slice.
    pub fn as_slice(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Most recent event.
    pub fn last(&self) -> Option<&ProtocolEvent> {
        self.events.last()
    }

    /// Events of one kind, in order.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &ProtocolEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Kinds of all events, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Kinds of the events that put bytes on the wire, in order.
    ///
    /// This is the flow an on-path observer sees: `init`, `key_exchange` and
    /// `negotiation_result` are local and do not appear.
    pub fn wire_kinds(&self) -> Vec<EventKind> {
        self.events.iter().filter(|e| e.payload_len.is_some()).map(|e| e.kind).collect()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a ProtocolEvent;
    type IntoIter = std::slice::Iter<'a, ProtocolEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
