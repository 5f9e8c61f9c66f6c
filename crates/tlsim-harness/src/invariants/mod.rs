//! Invariant checking over session logs.
//!
//! Invariants are properties that must hold after any sequence of calls on a
//! session, whatever the policies, seed or script. Scenario tests pin one
//! run; invariants cover all of them.
//!
//! # Architecture
//!
//! A [`RunSnapshot`] copies the event log, crypto trace and packet log out of a
//! session. Registered [`Invariant`] checks then run against the copy.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = RunSnapshot::from_session(&session);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    CloseNotifyLast, ContiguousOrdinals, CryptoReferencesEvents, DataRequiresEstablished,
    FinishedBeforeData, InitFirst, PacketsMatchEvents, ReceivedNeverExceedsSent, SingleOutcome,
};
pub use snapshot::RunSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against a session snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against `state`.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &RunSnapshot) -> InvariantResult;

    /// Build a violation attributed to this invariant.
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the log invariants every session must keep.
    ///
    /// Includes:
    /// - [`InitFirst`]: `init` opens the log, once
    /// - [`SingleOutcome`]: one `negotiation_result` once terminal, closing the handshake
    /// - [`DataRequiresEstablished`]: no data-phase events without an established handshake
    /// - [`FinishedBeforeData`]: both `finished` events precede any data
    /// - [`CloseNotifyLast`]: nothing follows `close_notify`
    /// - [`ReceivedNeverExceedsSent`]: every delivery has a matching send
    /// - [`CryptoReferencesEvents`]: trace entries point at existing events, in order
    /// - [`PacketsMatchEvents`]: packets mirror payload-bearing events
    /// - [`ContiguousOrdinals`]: ordinals are `0..n`
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(InitFirst);
        registry.add(SingleOutcome);
        registry.add(DataRequiresEstablished);
        registry.add(FinishedBeforeData);
        registry.add(CloseNotifyLast);
        registry.add(ReceivedNeverExceedsSent);
        registry.add(CryptoReferencesEvents);
        registry.add(PacketsMatchEvents);
        registry.add(ContiguousOrdinals);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &RunSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &RunSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
