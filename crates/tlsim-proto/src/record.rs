//! TLS record header with zero-copy parsing.
//!
//! Every simulated packet is one or more TLSPlaintext/TLSCiphertext records.
//! The 5-byte header is laid out exactly as on the wire: content type, legacy
//! version (always 0x0303 in TLS 1.3), and a big-endian length.
//!
//! The simulator reports the logical content type of encrypted records
//! (handshake, alert) instead of the `application_data` outer type a real
//! TLS 1.3 stack would put on the wire, so the trace stays readable.

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Maximum plaintext fragment per record (2^14).
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Maximum record payload after encryption (2^14 + 256).
pub const MAX_CIPHERTEXT_LEN: usize = MAX_FRAGMENT_LEN + 256;

/// AEAD authentication tag size for every TLS 1.3 suite.
pub const AEAD_TAG_LEN: usize = 16;

/// Record content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Alert (21)
    Alert,
    /// Handshake (22)
    Handshake,
    /// Application data (23)
    ApplicationData,
}

impl RecordType {
    /// Content type byte.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Alert => 21,
            Self::Handshake => 22,
            Self::ApplicationData => 23,
        }
    }

    /// Lowercase name as used in packet traces.
    pub fn name(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Handshake => "handshake",
            Self::ApplicationData => "application_data",
        }
    }

    /// Parse a content type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }
}

/// Whether a record body is readable by an on-path observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Sent in the clear (ClientHello, ServerHello)
    Plaintext,
    /// AEAD-protected
    OpaqueCiphertext,
}

/// Fixed 5-byte record header (big endian).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RecordHeader {
    content_type: u8,
    legacy_version: [u8; 2],
    length: [u8; 2],
}

impl RecordHeader {
    /// Serialized header size.
    pub const SIZE: usize = 5;

    /// Legacy record version carried by every TLS 1.3 record.
    pub const LEGACY_VERSION: u16 = 0x0303;

    /// Header for a record of `record_type` carrying `length` body bytes.
    pub fn new(record_type: RecordType, length: u16) -> Self {
        Self {
            content_type: record_type.to_u8(),
            legacy_version: Self::LEGACY_VERSION.to_be_bytes(),
            length: length.to_be_bytes(),
        }
    }

    /// Parse a header from the start of `bytes` without copying.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::RecordTooShort` if fewer than 5 bytes are available
    /// - `ProtocolError::UnknownRecordType` for content types other than
    ///   alert, handshake and application data
    /// - `ProtocolError::UnsupportedLegacyVersion` if the version is not 0x0303
    /// - `ProtocolError::RecordTooLarge` if length exceeds 2^14 + 256
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::RecordTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if RecordType::from_u8(header.content_type).is_none() {
            return Err(ProtocolError::UnknownRecordType(header.content_type));
        }

        let version = u16::from_be_bytes(header.legacy_version);
        if version != Self::LEGACY_VERSION {
            return Err(ProtocolError::UnsupportedLegacyVersion(version));
        }

        let length = usize::from(header.length());
        if length > MAX_CIPHERTEXT_LEN {
            return Err(ProtocolError::RecordTooLarge { size: length, max: MAX_CIPHERTEXT_LEN });
        }

        Ok(header)
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Append the header to a buffer.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(self.as_bytes());
    }

    /// Content type, `None` only for headers that bypassed validation.
    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::from_u8(self.content_type)
    }

    /// Body length in bytes.
    pub fn length(&self) -> u16 {
        u16::from_be_bytes(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_matches_wire() {
        let header = RecordHeader::new(RecordType::Handshake, 0x0123);
        assert_eq!(header.to_bytes(), [22, 0x03, 0x03, 0x01, 0x23]);
    }

    #[test]
    fn decode_rejects_bad_inputs() {
        assert_eq!(
            RecordHeader::from_bytes(&[22, 3, 3]),
            Err(ProtocolError::RecordTooShort { expected: 5, actual: 3 })
        );
        assert_eq!(
            RecordHeader::from_bytes(&[20, 3, 3, 0, 1]),
            Err(ProtocolError::UnknownRecordType(20))
        );
        assert_eq!(
            RecordHeader::from_bytes(&[23, 3, 1, 0, 1]),
            Err(ProtocolError::UnsupportedLegacyVersion(0x0301))
        );
        assert_eq!(
            RecordHeader::from_bytes(&[23, 3, 3, 0x41, 0x01]),
            Err(ProtocolError::RecordTooLarge { size: 0x4101, max: MAX_CIPHERTEXT_LEN })
        );
    }

    #[test]
    fn decode_reads_prefix_only() {
        let bytes = [21, 3, 3, 0, 2, 1, 0, 0xff];
        let header = RecordHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.record_type(), Some(RecordType::Alert));
        assert_eq!(header.length(), 2);
    }
}
