//! The three session logs, written together.
//!
//! Crypto operations are staged until the event they belong to is appended,
//! then flushed with that event's ordinal. Every trace entry and every packet
//! therefore points at an event that exists.

use crate::{
    event::{EventKind, EventLog, ProtocolEvent, Side},
    trace::{CryptoOp, CryptoRecorder},
    wire::{PacketLog, WireFramer, WirePacket},
};

#[derive(Debug, Clone)]
struct StagedOp {
    side: Side,
    state_label: &'static str,
    operation: CryptoOp,
    inputs: String,
    outputs: String,
}

/// Event log, crypto trace and packet log of one session.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    events: EventLog,
    crypto: CryptoRecorder,
    packets: PacketLog,
    staged: Vec<StagedOp>,
}

impl Journal {
    /// Stage an operation for the next event.
    pub(crate) fn crypto(
        &mut self,
        side: Side,
        state_label: &'static str,
        operation: CryptoOp,
        inputs: String,
        outputs: String,
    ) {
        self.staged.push(StagedOp { side, state_label, operation, inputs, outputs });
    }

    /// Append an event, attach staged operations to it and frame it.
    pub(crate) fn emit(
        &mut self,
        kind: EventKind,
        side: Side,
        summary: String,
        payload_len: Option<usize>,
    ) -> Option<WirePacket> {
        let event: ProtocolEvent = self.events.push(kind, side, summary, payload_len).clone();

        for op in self.staged.drain(..) {
            self.crypto.record(
                event.ordinal,
                op.side,
                op.state_label,
                op.operation,
                op.inputs,
                op.outputs,
            );
        }

        WireFramer::frame(&event).map(|packet| self.packets.push(packet).clone())
    }

    pub(crate) fn events(&self) -> &EventLog {
        &self.events
    }

    pub(crate) fn crypto_trace(&self) -> &CryptoRecorder {
        &self.crypto
    }

    pub(crate) fn packets(&self) -> &PacketLog {
        &self.packets
    }
}
