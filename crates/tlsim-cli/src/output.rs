//! Text and JSON rendering of a [`Report`].

use std::io::{self, Write};

use tlsim_core::{NegotiationResult, Observation, render_table};
use tlsim_proto::PayloadKind;

use crate::runner::Report;

/// Human-readable sections: steps (when asked), events, crypto trace,
/// packets, outcome and the summary table.
pub fn write_text(out: &mut impl Write, report: &Report, steps: bool) -> io::Result<()> {
    if steps {
        writeln!(out, "== Handshake steps ==")?;
        for (index, state) in report.steps.iter().enumerate() {
            writeln!(out, "  {:>2}. {state}", index + 1)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "== Events ==")?;
    for event in &report.events {
        let size = event.payload_len.map(|len| format!(" ({len} B)")).unwrap_or_default();
        writeln!(
            out,
            "  #{:<3} [{}] {}{size}: {}",
            event.ordinal, event.side, event.kind, event.summary
        )?;
    }

    writeln!(out)?;
    writeln!(out, "== Crypto trace ==")?;
    for entry in report.crypto.iter() {
        let side = entry.side.to_string();
        writeln!(
            out,
            "  #{:<3} {side:<6} {:<22} {:<15} {} -> {}",
            entry.event,
            entry.state_label,
            entry.operation.as_str(),
            entry.inputs,
            entry.outputs
        )?;
    }

    writeln!(out)?;
    writeln!(out, "== Packets ==")?;
    for packet in report.packets.iter() {
        let observation = match packet.observation {
            Observation::Sent => "sent",
            Observation::Received => "received",
        };
        let payload = match packet.payload_kind {
            PayloadKind::Plaintext => "plaintext",
            PayloadKind::OpaqueCiphertext => "ciphertext",
        };
        writeln!(
            out,
            "  #{:<3} {} -> {} {observation} {} {payload} {} B in {} record(s)",
            packet.event,
            packet.sender,
            packet.sender.peer(),
            packet.record_type.name(),
            packet.wire_len(),
            packet.records.len()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "== Result ==")?;
    writeln!(out, "  {}", outcome_line(report.outcome.as_ref()))?;
    writeln!(out)?;
    write!(out, "{}", render_table(std::slice::from_ref(&report.record)))
}

/// Pretty JSON of the whole report, newline terminated.
pub fn write_json(out: &mut impl Write, report: &Report) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

/// One-line outcome summary.
pub fn outcome_line(outcome: Option<&NegotiationResult>) -> String {
    match outcome {
        None => "handshake not finished".to_string(),
        Some(NegotiationResult::Established(established)) => {
            let client = established
                .client_identity
                .as_ref()
                .map_or("anonymous", |identity| identity.algorithm().name());
            format!(
                "established {} over {}, server {} ({}), client {client}",
                established.suite,
                established.group.name(),
                established.server_identity.algorithm().name(),
                established.server_scheme.name()
            )
        },
        Some(NegotiationResult::Failed { reason, detail }) => match detail {
            Some(detail) => format!("failed: {} ({detail})", reason.description()),
            None => format!("failed: {}", reason.description()),
        },
    }
}

#[cfg(test)]
mod tests {
    use tlsim_core::FailureReason;

    use super::*;

    #[test]
    fn failure_line_carries_detail() {
        let outcome = NegotiationResult::Failed {
            reason: FailureReason::NoCommonGroup,
            detail: Some("client [X25519] server [P-384]".to_string()),
        };
        insta::assert_snapshot!(
            outcome_line(Some(&outcome)),
            @"failed: no common key exchange group (client [X25519] server [P-384])"
        );
    }

    #[test]
    fn unfinished_handshake() {
        assert_eq!(outcome_line(None), "handshake not finished");
    }
}
