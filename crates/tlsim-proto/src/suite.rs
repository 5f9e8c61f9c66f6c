//! TLS 1.3 cipher suites.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Record-layer cipher suite (AEAD plus handshake hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CipherSuite {
    /// `TLS_AES_128_GCM_SHA256` (0x1301)
    Aes128GcmSha256,
    /// `TLS_AES_256_GCM_SHA384` (0x1302)
    Aes256GcmSha384,
    /// `TLS_CHACHA20_POLY1305_SHA256` (0x1303)
    Chacha20Poly1305Sha256,
}

impl CipherSuite {
    /// Every supported suite, in default preference order.
    pub const ALL: [Self; 3] =
        [Self::Aes256GcmSha384, Self::Aes128GcmSha256, Self::Chacha20Poly1305Sha256];

    /// IANA registry name.
    pub fn iana_name(self) -> &'static str {
        match self {
            Self::Aes128GcmSha256 => "TLS_AES_128_GCM_SHA256",
            Self::Aes256GcmSha384 => "TLS_AES_256_GCM_SHA384",
            Self::Chacha20Poly1305Sha256 => "TLS_CHACHA20_POLY1305_SHA256",
        }
    }

    /// Look up a suite by IANA name (case-insensitive).
    pub fn from_iana_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|suite| suite.iana_name().eq_ignore_ascii_case(name.trim()))
    }

    /// Two-byte code point from the TLS cipher suite registry.
    pub fn code(self) -> u16 {
        match self {
            Self::Aes128GcmSha256 => 0x1301,
            Self::Aes256GcmSha384 => 0x1302,
            Self::Chacha20Poly1305Sha256 => 0x1303,
        }
    }

    /// Handshake hash of the suite.
    pub fn hash(self) -> HashAlgorithm {
        match self {
            Self::Aes256GcmSha384 => HashAlgorithm::Sha384,
            Self::Aes128GcmSha256 | Self::Chacha20Poly1305Sha256 => HashAlgorithm::Sha256,
        }
    }

    /// AEAD key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128GcmSha256 => 16,
            Self::Aes256GcmSha384 | Self::Chacha20Poly1305Sha256 => 32,
        }
    }

    /// AEAD nonce (IV) length in bytes. 12 for every TLS 1.3 suite.
    pub fn iv_len(self) -> usize {
        12
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iana_name())
    }
}

/// Hash function used by the key schedule and transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iana_names_resolve_back() {
        for suite in CipherSuite::ALL {
            assert_eq!(CipherSuite::from_iana_name(suite.iana_name()), Some(suite));
        }
        assert_eq!(
            CipherSuite::from_iana_name("tls_chacha20_poly1305_sha256"),
            Some(CipherSuite::Chacha20Poly1305Sha256)
        );
        assert_eq!(CipherSuite::from_iana_name("TLS_RSA_WITH_RC4_128_MD5"), None);
    }

    #[test]
    fn sha384_only_for_aes256() {
        assert_eq!(CipherSuite::Aes256GcmSha384.hash().output_len(), 48);
        assert_eq!(CipherSuite::Aes128GcmSha256.hash().output_len(), 32);
        assert_eq!(CipherSuite::Chacha20Poly1305Sha256.hash().output_len(), 32);
    }
}
