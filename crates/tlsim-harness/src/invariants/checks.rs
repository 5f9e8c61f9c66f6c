//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use tlsim_core::EventKind;

use super::{Invariant, InvariantResult, RunSnapshot};

fn is_data(kind: EventKind) -> bool {
    !kind.is_handshake_phase()
}

/// The log opens with exactly one `init`.
pub struct InitFirst;

impl Invariant for InitFirst {
    fn name(&self) -> &'static str {
        "init_first"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        match state.events.first().map(|e| e.kind) {
            Some(EventKind::Init) => {},
            first => return Err(self.violation(format!("log starts with {first:?}"))),
        }
        let count = state.count(EventKind::Init);
        if count != 1 {
            return Err(self.violation(format!("{count} init events")));
        }
        Ok(())
    }
}

/// A terminal handshake has exactly one `negotiation_result`, and it is the
/// last handshake-phase event. A running handshake has none.
pub struct SingleOutcome;

impl Invariant for SingleOutcome {
    fn name(&self) -> &'static str {
        "single_outcome"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let count = state.count(EventKind::NegotiationResult);
        let terminal = state.state.is_terminal();

        if terminal != (count == 1) || count > 1 {
            return Err(self.violation(format!(
                "state {} with {count} negotiation_result events",
                state.state
            )));
        }
        if terminal != state.outcome.is_some() {
            return Err(self.violation(format!(
                "state {} but outcome present = {}",
                state.state,
                state.outcome.is_some()
            )));
        }

        if let Some(position) = state.first(EventKind::NegotiationResult) {
            if let Some(late) =
                state.events[position + 1..].iter().find(|e| e.kind.is_handshake_phase())
            {
                return Err(self.violation(format!(
                    "{} at ordinal {} after negotiation_result",
                    late.kind, late.ordinal
                )));
            }
        }
        Ok(())
    }
}

/// Data-phase events only exist on an established handshake.
pub struct DataRequiresEstablished;

impl Invariant for DataRequiresEstablished {
    fn name(&self) -> &'static str {
        "data_requires_established"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        if state.is_established() {
            return Ok(());
        }
        match state.events.iter().find(|e| is_data(e.kind)) {
            Some(event) => Err(self.violation(format!(
                "{} at ordinal {} in state {}",
                event.kind, event.ordinal, state.state
            ))),
            None => Ok(()),
        }
    }
}

/// Both `finished` events come before the first data-phase event.
pub struct FinishedBeforeData;

impl Invariant for FinishedBeforeData {
    fn name(&self) -> &'static str {
        "finished_before_data"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let Some(first_data) = state.events.iter().position(|e| is_data(e.kind)) else {
            return Ok(());
        };
        let finished = state.events[..first_data]
            .iter()
            .filter(|e| e.kind == EventKind::Finished)
            .count();
        if finished != 2 {
            return Err(self.violation(format!(
                "{finished} finished events before the first data event at ordinal {first_data}"
            )));
        }
        Ok(())
    }
}

/// At most one `close_notify`, it is the final event, and it matches the
/// closed flag.
pub struct CloseNotifyLast;

impl Invariant for CloseNotifyLast {
    fn name(&self) -> &'static str {
        "close_notify_last"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let count = state.count(EventKind::CloseNotify);
        if count > 1 {
            return Err(self.violation(format!("{count} close_notify events")));
        }
        if state.closed != (count == 1) {
            return Err(self.violation(format!(
                "closed = {} with {count} close_notify events",
                state.closed
            )));
        }
        if count == 1 && state.events.last().map(|e| e.kind) != Some(EventKind::CloseNotify) {
            return Err(self.violation("events follow close_notify".to_string()));
        }
        Ok(())
    }
}

/// Every `message_received` is preceded by a `message_sent` not yet
/// delivered, and the in-flight count is the difference.
pub struct ReceivedNeverExceedsSent;

impl Invariant for ReceivedNeverExceedsSent {
    fn name(&self) -> &'static str {
        "received_never_exceeds_sent"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let mut pending = 0usize;
        for event in &state.events {
            match event.kind {
                EventKind::MessageSent => pending += 1,
                EventKind::MessageReceived => {
                    if pending == 0 {
                        return Err(self.violation(format!(
                            "message_received at ordinal {} with nothing in flight",
                            event.ordinal
                        )));
                    }
                    pending -= 1;
                },
                _ => {},
            }
        }
        if pending != state.in_flight {
            return Err(self.violation(format!(
                "log leaves {pending} in flight, session reports {}",
                state.in_flight
            )));
        }
        Ok(())
    }
}

/// Crypto trace entries point at existing events, in log order.
pub struct CryptoReferencesEvents;

impl Invariant for CryptoReferencesEvents {
    fn name(&self) -> &'static str {
        "crypto_references_events"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let len = state.events.len() as u64;
        let mut previous = 0;
        for (index, entry) in state.crypto.iter().enumerate() {
            if entry.event >= len {
                return Err(self.violation(format!(
                    "entry {index} ({}) points at missing event {}",
                    entry.operation.as_str(),
                    entry.event
                )));
            }
            if entry.event < previous {
                return Err(self.violation(format!(
                    "entry {index} points at event {} after event {previous}",
                    entry.event
                )));
            }
            previous = entry.event;
        }
        Ok(())
    }
}

/// Exactly one packet per payload-bearing event, with the event's kind and
/// payload length.
pub struct PacketsMatchEvents;

impl Invariant for PacketsMatchEvents {
    fn name(&self) -> &'static str {
        "packets_match_events"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let bearing: Vec<_> = state.events.iter().filter(|e| e.payload_len.is_some()).collect();
        if bearing.len() != state.packets.len() {
            return Err(self.violation(format!(
                "{} payload-bearing events but {} packets",
                bearing.len(),
                state.packets.len()
            )));
        }

        for (event, packet) in bearing.iter().zip(&state.packets) {
            let mismatch = packet.event != event.ordinal
                || packet.kind != event.kind
                || Some(packet.fragment_len) != event.payload_len;
            if mismatch {
                return Err(self.violation(format!(
                    "packet for event {} ({}) does not match event {} ({})",
                    packet.event, packet.kind, event.ordinal, event.kind
                )));
            }
        }
        Ok(())
    }
}

/// Ordinals are `0, 1, 2, ...` in log order.
pub struct ContiguousOrdinals;

impl Invariant for ContiguousOrdinals {
    fn name(&self) -> &'static str {
        "contiguous_ordinals"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        for (index, event) in state.events.iter().enumerate() {
            if event.ordinal != index as u64 {
                return Err(self.violation(format!(
                    "event at position {index} has ordinal {}",
                    event.ordinal
                )));
            }
        }
        Ok(())
    }
}
