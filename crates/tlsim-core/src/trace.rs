//! Cryptographic operation trace.
//!
//! A passive sink: the engine records every key generation, agreement,
//! signature, AEAD call and key derivation it performs. Recording never fails
//! and the recorder knows nothing about negotiation.

use std::fmt;

use serde::Serialize;

use crate::event::Side;

/// Hex of the first bytes of `bytes`, for summaries.
pub(crate) fn preview(bytes: &[u8]) -> String {
    const SHOWN: usize = 8;
    if bytes.len() <= SHOWN {
        hex::encode(bytes)
    } else {
        format!("{}...", hex::encode(&bytes[..SHOWN]))
    }
}

/// Kind of cryptographic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoOp {
    /// Ephemeral key pair generation
    Keygen,
    /// Diffie-Hellman agreement
    Ecdh,
    /// KEM encapsulation (server)
    KemEncapsulate,
    /// KEM decapsulation (client)
    KemDecapsulate,
    /// `CertificateVerify` signature
    Sign,
    /// `CertificateVerify` check
    Verify,
    /// Record protection
    AeadEncrypt,
    /// Record removal of protection
    AeadDecrypt,
    /// Key schedule step
    Kdf,
}

impl CryptoOp {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keygen => "keygen",
            Self::Ecdh => "ecdh",
            Self::KemEncapsulate => "kem_encapsulate",
            Self::KemDecapsulate => "kem_decapsulate",
            Self::Sign => "sign",
            Self::Verify => "verify",
            Self::AeadEncrypt => "aead_encrypt",
            Self::AeadDecrypt => "aead_decrypt",
            Self::Kdf => "kdf",
        }
    }
}

impl fmt::Display for CryptoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoTraceEntry {
    /// Ordinal of the protocol event this operation belongs to
    pub event: u64,
    /// Side that performed it
    pub side: Side,
    /// Handshake state label at the time of the operation
    pub state_label: &'static str,
    /// Operation kind
    pub operation: CryptoOp,
    /// Summary of inputs (sizes, algorithm names, previews)
    pub inputs: String,
    /// Summary of outputs
    pub outputs: String,
}

/// Append-only operation log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CryptoRecorder {
    entries: Vec<CryptoTraceEntry>,
}

impl CryptoRecorder {
    /// Record one operation.
    pub fn record(
        &mut self,
        event: u64,
        side: Side,
        state_label: &'static str,
        operation: CryptoOp,
        inputs: String,
        outputs: String,
    ) {
        tracing::trace!(event, %side, state = state_label, op = %operation, %inputs, %outputs);
        self.entries.push(CryptoTraceEntry {
            event,
            side,
            state_label,
            operation,
            inputs,
            outputs,
        });
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&CryptoTraceEntry> {
        self.entries.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &CryptoTraceEntry> {
        self.entries.iter()
    }

    /// Entries of one operation kind.
    pub fn by_operation(&self, operation: CryptoOp) -> impl Iterator<Item = &CryptoTraceEntry> {
        self.entries.iter().filter(move |e| e.operation == operation)
    }

    /// Entries attached to the event at `ordinal`.
    pub fn for_event(&self, ordinal: u64) -> impl Iterator<Item = &CryptoTraceEntry> {
        self.entries.iter().filter(move |e| e.event == ordinal)
    }
}
