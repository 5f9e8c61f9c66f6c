//! Key exchange groups offered in `supported_groups` / `key_share`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a group establishes the shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KexMechanism {
    /// Both sides contribute a public key and run Diffie-Hellman.
    Ecdh,
    /// The server encapsulates to the client's encapsulation key.
    Kem,
}

/// Named group for the ephemeral key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyExchangeGroup {
    /// Curve25519 ECDH
    X25519,
    /// NIST P-256 (secp256r1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
    /// ML-KEM-768 lattice KEM (FIPS 203)
    MlKem768,
}

impl KeyExchangeGroup {
    /// Every supported group.
    pub const ALL: [Self; 4] = [Self::X25519, Self::P256, Self::P384, Self::MlKem768];

    /// Display name used by the policy text format.
    pub fn name(self) -> &'static str {
        match self {
            Self::X25519 => "X25519",
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::MlKem768 => "ML-KEM-768",
        }
    }

    /// Look up a group by name. Accepts the OpenSSL spellings as aliases; the
    /// `X25519MLKEM768` hybrid is treated as ML-KEM-768.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let alias = |candidates: &[&str]| candidates.iter().any(|c| c.eq_ignore_ascii_case(name));

        if alias(&["X25519"]) {
            Some(Self::X25519)
        } else if alias(&["P-256", "P256", "secp256r1", "prime256v1"]) {
            Some(Self::P256)
        } else if alias(&["P-384", "P384", "secp384r1"]) {
            Some(Self::P384)
        } else if alias(&["ML-KEM-768", "MLKEM768", "X25519MLKEM768"]) {
            Some(Self::MlKem768)
        } else {
            None
        }
    }

    /// `NamedGroup` code point.
    pub fn code(self) -> u16 {
        match self {
            Self::X25519 => 0x001d,
            Self::P256 => 0x0017,
            Self::P384 => 0x0018,
            Self::MlKem768 => 0x0201,
        }
    }

    /// Post-quantum groups resist a quantum adversary recording the exchange.
    pub fn is_post_quantum(self) -> bool {
        matches!(self, Self::MlKem768)
    }

    /// Agreement mechanism.
    pub fn mechanism(self) -> KexMechanism {
        match self {
            Self::MlKem768 => KexMechanism::Kem,
            Self::X25519 | Self::P256 | Self::P384 => KexMechanism::Ecdh,
        }
    }

    /// Bytes of the client's `key_share` entry (public key or encapsulation key).
    pub fn client_share_len(self) -> usize {
        match self {
            Self::X25519 => 32,
            Self::P256 => 65,
            Self::P384 => 97,
            Self::MlKem768 => 1184,
        }
    }

    /// Bytes of the server's `key_share` entry (public key or ciphertext).
    pub fn server_share_len(self) -> usize {
        match self {
            Self::X25519 => 32,
            Self::P256 => 65,
            Self::P384 => 97,
            Self::MlKem768 => 1088,
        }
    }

    /// Bytes of the resulting shared secret.
    pub fn shared_secret_len(self) -> usize {
        match self {
            Self::P384 => 48,
            Self::X25519 | Self::P256 | Self::MlKem768 => 32,
        }
    }
}

impl fmt::Display for KeyExchangeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openssl_aliases_resolve() {
        assert_eq!(KeyExchangeGroup::from_name("secp384r1"), Some(KeyExchangeGroup::P384));
        assert_eq!(KeyExchangeGroup::from_name("prime256v1"), Some(KeyExchangeGroup::P256));
        assert_eq!(KeyExchangeGroup::from_name("MLKEM768"), Some(KeyExchangeGroup::MlKem768));
        assert_eq!(KeyExchangeGroup::from_name("ffdhe2048"), None);
    }

    #[test]
    fn only_mlkem_is_kem() {
        for group in KeyExchangeGroup::ALL {
            assert_eq!(group.is_post_quantum(), group.mechanism() == KexMechanism::Kem);
        }
    }

    #[test]
    fn kem_shares_are_asymmetric() {
        let group = KeyExchangeGroup::MlKem768;
        assert!(group.client_share_len() > group.server_share_len());
        assert_eq!(KeyExchangeGroup::X25519.client_share_len(), 32);
    }
}
