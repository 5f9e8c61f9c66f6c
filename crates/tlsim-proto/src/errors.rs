//! Error types for record parsing and the policy text format.

use thiserror::Error;

/// Result alias for record-layer parsing.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding a record header from raw bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than a record header
    #[error("record too short: expected at least {expected} bytes, got {actual}")]
    RecordTooShort {
        /// Minimum bytes required
        expected: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Content type byte is not one the simulator produces
    #[error("unknown record content type: {0}")]
    UnknownRecordType(u8),

    /// Legacy record version is not 0x0303
    #[error("unsupported legacy record version: {0:#06x}")]
    UnsupportedLegacyVersion(u16),

    /// Length field exceeds the TLS 1.3 ciphertext limit
    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge {
        /// Declared record length
        size: usize,
        /// Maximum allowed length
        max: usize,
    },
}

/// Errors produced by [`crate::config::parse`] and [`crate::config::render`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Line is neither a comment, a section header, nor `key = value`
    #[error("line {line}: expected `key = value`, got {content:?}")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Offending line content
        content: String,
    },

    /// Cipher suite token not in the supported vocabulary
    #[error("unknown cipher suite: {0}")]
    UnknownCipherSuite(String),

    /// Group token not in the supported vocabulary
    #[error("unknown key exchange group: {0}")]
    UnknownGroup(String),

    /// Signature scheme token not in the supported vocabulary
    #[error("unknown signature scheme: {0}")]
    UnknownSignatureScheme(String),

    /// Identity or trust anchor algorithm not in the supported vocabulary
    #[error("unknown signature algorithm: {0}")]
    UnknownSignatureAlgorithm(String),

    /// Protocol bound other than TLS 1.3
    #[error("unsupported protocol version for {key}: {value} (only TLSv1.3)")]
    UnsupportedProtocol {
        /// `MinProtocol` or `MaxProtocol`
        key: String,
        /// Value found in the file
        value: String,
    },

    /// Policy carries material the text format cannot express
    #[error("policy cannot be rendered as text: {0}")]
    Unrepresentable(&'static str),
}
