//! Per-run size comparison.
//!
//! A [`RunRecord`] summarizes one finished session: which identities and CAs
//! took part, what was negotiated and how many bytes went over the wire. Only
//! [`Observation::Sent`](crate::wire::Observation::Sent) packets count, so a
//! message is not billed twice for its received view.

use std::fmt::{self, Write as _};

use serde::Serialize;
use tlsim_proto::{
    CipherSuite, EndpointPolicy, KeyExchangeGroup, RecordType, SignatureAlgorithm,
};

use crate::{
    negotiation::{FailureReason, NegotiationResult},
    wire::PacketLog,
};

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    /// 1-based run number within a simulator
    pub id: u64,
    /// Handshake established
    pub success: bool,
    /// Failure reason of an aborted handshake
    pub failure: Option<FailureReason>,
    /// Configured client identity
    pub client_identity: Option<SignatureAlgorithm>,
    /// CA key type of the client chain
    pub client_ca: Option<SignatureAlgorithm>,
    /// Configured server identity
    pub server_identity: Option<SignatureAlgorithm>,
    /// CA key type of the server chain
    pub server_ca: Option<SignatureAlgorithm>,
    /// Negotiated group
    pub key_exchange: Option<KeyExchangeGroup>,
    /// Negotiated suite
    pub cipher: Option<CipherSuite>,
    /// All bytes sent
    pub total_bytes: usize,
    /// Bytes sent in handshake records
    pub handshake_bytes: usize,
    /// Bytes sent in application data records
    pub app_data_bytes: usize,
}

impl RunRecord {
    /// Summarize a run from its policies, outcome and packets.
    pub fn new(
        id: u64,
        client: &EndpointPolicy,
        server: &EndpointPolicy,
        outcome: Option<&NegotiationResult>,
        packets: &PacketLog,
    ) -> Self {
        let established = outcome.and_then(NegotiationResult::established);
        Self {
            id,
            success: established.is_some(),
            failure: outcome.and_then(NegotiationResult::failure),
            client_identity: client.identity().map(|i| i.algorithm()),
            client_ca: client.identity().map(|i| i.ca_algorithm()),
            server_identity: server.identity().map(|i| i.algorithm()),
            server_ca: server.identity().map(|i| i.ca_algorithm()),
            key_exchange: established.map(|e| e.group),
            cipher: established.map(|e| e.suite),
            total_bytes: packets.total_sent_bytes(),
            handshake_bytes: packets.sent_bytes(RecordType::Handshake),
            app_data_bytes: packets.sent_bytes(RecordType::ApplicationData),
        }
    }
}

const HEADERS: [&str; 11] = [
    "#",
    "Result",
    "Client Identity",
    "Client CA",
    "Server Identity",
    "Server CA",
    "Key Exchange",
    "Cipher",
    "Total Data",
    "Handshake",
    "App Data",
];

/// Render records as an aligned text table.
pub fn render_table(records: &[RunRecord]) -> String {
    let rows: Vec<[String; 11]> = records.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = HEADERS.map(str::to_string);
    write_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn row(record: &RunRecord) -> [String; 11] {
    let result = match record.failure {
        None if record.success => "OK".to_string(),
        None => "-".to_string(),
        Some(reason) => reason.to_string(),
    };
    [
        record.id.to_string(),
        result,
        cell(record.client_identity),
        cell(record.client_ca),
        cell(record.server_identity),
        cell(record.server_ca),
        cell(record.key_exchange),
        cell(record.cipher),
        kilobytes(record.total_bytes),
        kilobytes(record.handshake_bytes),
        format!("{} B", record.app_data_bytes),
    ]
}

fn cell<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

fn kilobytes(bytes: usize) -> String {
    let hundredths = bytes * 100 / 1024;
    format!("{}.{:02} KB", hundredths / 100, hundredths % 100)
}

fn write_row(out: &mut String, cells: &[String; 11], widths: &[usize; 11]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, width))| {
            if column >= 8 { format!("{cell:>width$}") } else { format!("{cell:<width$}") }
        })
        .collect();
    let _ = writeln!(out, "{}", line.join(" | ").trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RunRecord {
        RunRecord {
            id: 1,
            success: true,
            failure: None,
            client_identity: None,
            client_ca: None,
            server_identity: Some(SignatureAlgorithm::Rsa(tlsim_proto::RsaKeySize::Rsa2048)),
            server_ca: Some(SignatureAlgorithm::Rsa(tlsim_proto::RsaKeySize::Rsa2048)),
            key_exchange: Some(KeyExchangeGroup::X25519),
            cipher: Some(CipherSuite::Aes128GcmSha256),
            total_bytes: 4096,
            handshake_bytes: 3000,
            app_data_bytes: 120,
        }
    }

    #[test]
    fn kilobyte_formatting() {
        assert_eq!(kilobytes(0), "0.00 KB");
        assert_eq!(kilobytes(1024), "1.00 KB");
        assert_eq!(kilobytes(1536), "1.50 KB");
        assert_eq!(kilobytes(3000), "2.92 KB");
    }

    #[test]
    fn table_layout() {
        let table = render_table(&[record()]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("# | Result | Client Identity"));
        assert!(lines[2].contains("RSA-2048"));
        assert!(lines[2].contains("TLS_AES_128_GCM_SHA256"));
        assert!(lines[2].ends_with("120 B"));
    }

    #[test]
    fn failed_row_shows_reason() {
        let failed = RunRecord {
            success: false,
            failure: Some(FailureReason::NoCommonGroup),
            key_exchange: None,
            cipher: None,
            ..record()
        };
        let table = render_table(&[failed]);
        assert!(table.contains("NoCommonGroup"));
    }

    #[test]
    fn empty_history_is_header_only() {
        assert_eq!(render_table(&[]).lines().count(), 2);
    }
}
