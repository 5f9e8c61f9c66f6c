//! TLS 1.3 negotiation and session engine.
//!
//! Sans-IO and externally stepped. A [`Session`] is built from a client and a
//! server [`EndpointPolicy`](tlsim_proto::EndpointPolicy) plus a [`KeySource`];
//! each [`Session::advance`] performs one handshake transition and returns.
//! Everything the run does lands in three append-only logs:
//!
//! - [`EventLog`]: protocol events, `init` first
//! - [`CryptoRecorder`]: every primitive call, tied to the event it produced
//! - [`PacketLog`]: the simulated wire view of payload-bearing events
//!
//! ```text
//!   Policies + KeySource
//!          │
//!          ↓
//!   ┌─────────────┐ advance() ┌───────────┐ Established ┌───────────┐
//!   │   Session   │──────────>│ Handshake │────────────>│ Transport │
//!   └─────────────┘           └───────────┘             └───────────┘
//!          │                        │                         │
//!          ↓                        ↓                         ↓
//!   EventLog / CryptoRecorder / PacketLog (one journal per session)
//! ```
//!
//! A failed negotiation is a [`NegotiationResult::Failed`] value. Errors are
//! reserved for misuse, such as sending before the handshake established.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod event;
pub mod handshake;
mod journal;
pub mod negotiation;
pub mod presets;
pub mod report;
pub mod script;
pub mod session;
pub mod size;
pub mod trace;
pub mod transport;
pub mod validator;
pub mod wire;

pub use env::{FixedKeys, KeyPurpose, KeySource, SystemKeys};
pub use error::{ScriptError, SessionError};
pub use event::{EventKind, EventLog, ProtocolEvent, Side};
pub use handshake::HandshakeState;
pub use negotiation::{
    Established, FailureReason, NegotiationResult, select_cipher_suite, select_group,
    select_signature_scheme,
};
pub use presets::Preset;
pub use report::{RunRecord, render_table};
pub use script::{Command, parse_script};
pub use session::{Session, Simulator};
pub use size::SizeModel;
pub use trace::{CryptoOp, CryptoRecorder, CryptoTraceEntry};
pub use transport::Delivery;
pub use validator::{ChainError, validate_chain};
pub use wire::{Observation, PacketLog, WireFramer, WirePacket};
