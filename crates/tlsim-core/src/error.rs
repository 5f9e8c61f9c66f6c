//! Error types for the tlsim engine.
//!
//! Only usage violations are errors. A handshake that fails to negotiate is a
//! [`crate::NegotiationResult::Failed`] value and never surfaces here.

use thiserror::Error;
use tlsim_crypto::CryptoError;

use crate::{event::Side, handshake::HandshakeState};

/// Misuse of a session, or a primitive failure inside it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport operation before the handshake completed, or after it failed
    #[error("session not established: cannot {operation} in {state}")]
    SessionNotEstablished {
        /// Handshake state when the call was made
        state: HandshakeState,
        /// Attempted operation
        operation: &'static str,
    },

    /// Operation not allowed in the current state
    #[error("invalid state transition: cannot {operation} from {state}")]
    InvalidState {
        /// Handshake state when the call was made
        state: HandshakeState,
        /// Attempted operation
        operation: String,
    },

    /// `receive` with no record in flight
    #[error("no record in flight")]
    NothingInFlight,

    /// Transport operation attributed to something other than an endpoint
    #[error("{side} cannot {operation}")]
    InvalidSide {
        /// Side passed by the caller
        side: Side,
        /// Attempted operation
        operation: &'static str,
    },

    /// Primitive failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Malformed interaction script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Line that is not a known command
    #[error("line {line}: unknown command {content:?}")]
    UnknownCommand {
        /// 1-based line number
        line: usize,
        /// Offending line
        content: String,
    },
}
