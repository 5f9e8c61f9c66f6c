//! Test harness for the tlsim engine.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks log properties that must hold after any
//! sequence of session calls. Use [`InvariantRegistry::standard()`] for the
//! full set.
//!
//! # Model-Based Testing
//!
//! The `model` module predicts the result of every public session call
//! without cryptography. Operations are applied to both the model and a real
//! session, and their results are compared.
//!
//! # Scenarios
//!
//! [`Scenario`] drives one seeded session end to end and runs oracles over
//! the finished [`World`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod scenario;

pub use invariants::{
    CloseNotifyLast, ContiguousOrdinals, CryptoReferencesEvents, DataRequiresEstablished,
    FinishedBeforeData, InitFirst, Invariant, InvariantRegistry, InvariantResult,
    PacketsMatchEvents, ReceivedNeverExceedsSent, RunSnapshot, SingleOutcome, Violation,
};
pub use model::{
    ESTABLISHING_PATH, Endpoint, ModelSession, Operation, OperationResult, Rejection,
    SmallMessage, apply_to_session,
};
pub use scenario::{Oracle, Scenario, World};
