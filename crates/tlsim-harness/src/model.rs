//! Reference model of the session API.
//!
//! [`ModelSession`] predicts what every public call on a [`Session`] returns
//! from a few counters and a queue, without any cryptography. Model-based
//! tests apply the same [`Operation`] sequence to both and compare the
//! [`OperationResult`]s.
//!
//! The model needs to know how the handshake ends. [`ModelSession::new`]
//! takes the number of `advance` calls after which the handshake fails, or
//! `None` if it establishes.

use std::collections::VecDeque;

use arbitrary::Arbitrary;
use tlsim_core::{HandshakeState, KeySource, Session, SessionError, Side, WireFramer};
use tlsim_proto::PayloadKind;

/// Handshake states an establishing session passes through, in order.
pub const ESTABLISHING_PATH: [HandshakeState; 5] = [
    HandshakeState::ClientHelloSent,
    HandshakeState::ServerHelloSent,
    HandshakeState::KeyExchangeDone,
    HandshakeState::CertificateExchange,
    HandshakeState::Established,
];

/// Endpoint an operation acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Endpoint {
    /// Client side
    Client,
    /// Server side
    Server,
}

impl From<Endpoint> for Side {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Client => Side::Client,
            Endpoint::Server => Side::Server,
        }
    }
}

/// Small message content for testing.
///
/// Compact so shrunk cases stay readable. The size class picks an empty,
/// short, medium or multi-record message.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallMessage {
    /// Message seed (expanded to content)
    pub seed: u8,
    /// Length hint (0-3 maps to empty/small/medium/fragmented)
    pub size_class: u8,
}

impl SmallMessage {
    /// Expand to actual message bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = match self.size_class % 4 {
            0 => 0,
            1 => 8,
            2 => 300,
            _ => 20_000,
        };

        (0..len).map(|i: usize| self.seed.wrapping_add(i as u8)).collect()
    }
}

/// One call on the session API.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// `Session::advance`
    Advance,
    /// `Session::send`
    Send {
        /// Sending endpoint
        from: Endpoint,
        /// Message to send
        message: SmallMessage,
    },
    /// `Session::receive`
    Receive,
    /// `Session::close`
    Close {
        /// Endpoint sending `close_notify`
        from: Endpoint,
    },
}

/// Error class of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `SessionError::SessionNotEstablished`
    NotEstablished,
    /// `SessionError::InvalidState`
    InvalidState,
    /// `SessionError::NothingInFlight`
    NothingInFlight,
    /// Any other error
    Other,
}

impl From<&SessionError> for Rejection {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::SessionNotEstablished { .. } => Self::NotEstablished,
            SessionError::InvalidState { .. } => Self::InvalidState,
            SessionError::NothingInFlight => Self::NothingInFlight,
            SessionError::InvalidSide { .. } | SessionError::Crypto(_) => Self::Other,
        }
    }
}

/// Observable result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Handshake moved to this state
    Advanced(HandshakeState),
    /// Message framed into records of these body lengths
    Sent(Vec<usize>),
    /// Message delivered
    Delivered {
        /// Sender
        from: Side,
        /// Recipient
        to: Side,
        /// Decrypted bytes
        plaintext: Vec<u8>,
    },
    /// `close_notify` sent
    Closed,
    /// Call rejected
    Rejected(Rejection),
}

/// Cryptography-free prediction of a session.
#[derive(Debug, Clone)]
pub struct ModelSession {
    fails_after: Option<usize>,
    advances: usize,
    state: HandshakeState,
    closed: bool,
    queue: VecDeque<(Side, Vec<u8>)>,
}

impl ModelSession {
    /// Model of a handshake that fails on advance number `fails_after`, or
    /// establishes when `None`.
    pub fn new(fails_after: Option<usize>) -> Self {
        Self {
            fails_after,
            advances: 0,
            state: HandshakeState::Init,
            closed: false,
            queue: VecDeque::new(),
        }
    }

    /// Predicted handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Predicted in-flight count.
    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Apply `operation` and return what the session should report.
    pub fn apply(&mut self, operation: &Operation) -> OperationResult {
        match operation {
            Operation::Advance => self.advance(),
            Operation::Send { from, message } => {
                if let Err(rejection) = self.check_transport() {
                    return OperationResult::Rejected(rejection);
                }
                let plaintext = message.to_bytes();
                let records = WireFramer::records(plaintext.len(), PayloadKind::OpaqueCiphertext);
                self.queue.push_back(((*from).into(), plaintext));
                OperationResult::Sent(records)
            },
            Operation::Receive => {
                if let Err(rejection) = self.check_transport() {
                    return OperationResult::Rejected(rejection);
                }
                match self.queue.pop_front() {
                    Some((from, plaintext)) => {
                        OperationResult::Delivered { from, to: from.peer(), plaintext }
                    },
                    None => OperationResult::Rejected(Rejection::NothingInFlight),
                }
            },
            Operation::Close { .. } => {
                if let Err(rejection) = self.check_transport() {
                    return OperationResult::Rejected(rejection);
                }
                self.closed = true;
                OperationResult::Closed
            },
        }
    }

    fn advance(&mut self) -> OperationResult {
        if self.state.is_terminal() {
            return OperationResult::Rejected(Rejection::InvalidState);
        }
        self.advances += 1;
        self.state = if Some(self.advances) == self.fails_after {
            HandshakeState::Failed
        } else {
            ESTABLISHING_PATH[self.advances - 1]
        };
        OperationResult::Advanced(self.state)
    }

    fn check_transport(&self) -> Result<(), Rejection> {
        if self.state != HandshakeState::Established {
            return Err(Rejection::NotEstablished);
        }
        if self.closed {
            return Err(Rejection::InvalidState);
        }
        Ok(())
    }
}

/// Apply `operation` to a real session and reduce the outcome to what
/// [`ModelSession`] predicts.
pub fn apply_to_session<K: KeySource>(
    session: &mut Session<K>,
    operation: &Operation,
) -> OperationResult {
    let result = match operation {
        Operation::Advance => session.advance().map(OperationResult::Advanced),
        Operation::Send { from, message } => session
            .send((*from).into(), &message.to_bytes())
            .map(|packet| OperationResult::Sent(packet.records)),
        Operation::Receive => session.receive().map(|delivery| OperationResult::Delivered {
            from: delivery.from,
            to: delivery.to,
            plaintext: delivery.plaintext,
        }),
        Operation::Close { from } => {
            session.close((*from).into()).map(|()| OperationResult::Closed)
        },
    };
    result.unwrap_or_else(|err| {
        tracing::trace!(%err, "operation rejected");
        OperationResult::Rejected(Rejection::from(&err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn establishing_model_walks_the_path() {
        let mut model = ModelSession::new(None);
        let states: Vec<_> = (0..5).map(|_| model.apply(&Operation::Advance)).collect();
        assert_eq!(states, ESTABLISHING_PATH.map(OperationResult::Advanced).to_vec());
        assert_eq!(
            model.apply(&Operation::Advance),
            OperationResult::Rejected(Rejection::InvalidState)
        );
    }

    #[test]
    fn failing_model_rejects_transport() {
        let mut model = ModelSession::new(Some(2));
        model.apply(&Operation::Advance);
        assert_eq!(
            model.apply(&Operation::Advance),
            OperationResult::Advanced(HandshakeState::Failed)
        );
        assert_eq!(
            model.apply(&Operation::Receive),
            OperationResult::Rejected(Rejection::NotEstablished)
        );
    }

    #[test]
    fn fragmented_message_spans_two_records() {
        let message = SmallMessage { seed: 0, size_class: 3 };
        let records = WireFramer::records(message.to_bytes().len(), PayloadKind::OpaqueCiphertext);
        assert_eq!(records, [16_384 + 17, 3_616 + 17]);
    }
}
