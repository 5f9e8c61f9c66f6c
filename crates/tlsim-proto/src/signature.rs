//! Signature algorithms (what a key is) and signature schemes (what a peer
//! advertises in `signature_algorithms`).
//!
//! An identity carries exactly one [`SignatureAlgorithm`]. The verifying side
//! lists [`SignatureScheme`] values; a scheme supports an identity when both
//! belong to the same [`SignatureFamily`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// RSA modulus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RsaKeySize {
    /// 2048-bit modulus
    Rsa2048,
    /// 3072-bit modulus
    Rsa3072,
    /// 4096-bit modulus
    Rsa4096,
}

impl RsaKeySize {
    /// Modulus size in bits.
    pub fn bits(self) -> usize {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }
}

/// ECDSA curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EcdsaCurve {
    /// secp256r1
    P256,
    /// secp384r1
    P384,
}

/// ML-DSA (FIPS 204) parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MlDsaLevel {
    /// ML-DSA-44 (NIST category 2)
    MlDsa44,
    /// ML-DSA-65 (NIST category 3)
    MlDsa65,
    /// ML-DSA-87 (NIST category 5)
    MlDsa87,
}

/// Algorithm family. Verifiers support identities at family granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureFamily {
    /// RSA-PSS
    Rsa,
    /// ECDSA
    Ecdsa,
    /// ML-DSA
    MlDsa,
}

impl fmt::Display for SignatureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rsa => "RSA",
            Self::Ecdsa => "ECDSA",
            Self::MlDsa => "ML-DSA",
        })
    }
}

/// Key algorithm of an identity or certificate authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA with the given modulus size
    Rsa(RsaKeySize),
    /// ECDSA over the given curve
    Ecdsa(EcdsaCurve),
    /// ML-DSA at the given level
    MlDsa(MlDsaLevel),
}

impl SignatureAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 8] = [
        Self::Rsa(RsaKeySize::Rsa2048),
        Self::Rsa(RsaKeySize::Rsa3072),
        Self::Rsa(RsaKeySize::Rsa4096),
        Self::Ecdsa(EcdsaCurve::P256),
        Self::Ecdsa(EcdsaCurve::P384),
        Self::MlDsa(MlDsaLevel::MlDsa44),
        Self::MlDsa(MlDsaLevel::MlDsa65),
        Self::MlDsa(MlDsaLevel::MlDsa87),
    ];

    /// Family this algorithm belongs to.
    pub fn family(self) -> SignatureFamily {
        match self {
            Self::Rsa(_) => SignatureFamily::Rsa,
            Self::Ecdsa(_) => SignatureFamily::Ecdsa,
            Self::MlDsa(_) => SignatureFamily::MlDsa,
        }
    }

    /// Display name (`RSA-2048`, `ECDSA-P256`, `ML-DSA-44`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Rsa(RsaKeySize::Rsa2048) => "RSA-2048",
            Self::Rsa(RsaKeySize::Rsa3072) => "RSA-3072",
            Self::Rsa(RsaKeySize::Rsa4096) => "RSA-4096",
            Self::Ecdsa(EcdsaCurve::P256) => "ECDSA-P256",
            Self::Ecdsa(EcdsaCurve::P384) => "ECDSA-P384",
            Self::MlDsa(MlDsaLevel::MlDsa44) => "ML-DSA-44",
            Self::MlDsa(MlDsaLevel::MlDsa65) => "ML-DSA-65",
            Self::MlDsa(MlDsaLevel::MlDsa87) => "ML-DSA-87",
        }
    }

    /// Look up an algorithm by display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Encoded public key size in a certificate.
    pub fn public_key_len(self) -> usize {
        match self {
            // modulus plus DER SubjectPublicKeyInfo framing
            Self::Rsa(size) => size.bits() / 8 + 38,
            Self::Ecdsa(EcdsaCurve::P256) => 65,
            Self::Ecdsa(EcdsaCurve::P384) => 97,
            Self::MlDsa(MlDsaLevel::MlDsa44) => 1312,
            Self::MlDsa(MlDsaLevel::MlDsa65) => 1952,
            Self::MlDsa(MlDsaLevel::MlDsa87) => 2592,
        }
    }

    /// Signature size in bytes. ECDSA uses the typical DER encoding size.
    pub fn signature_len(self) -> usize {
        match self {
            Self::Rsa(size) => size.bits() / 8,
            Self::Ecdsa(EcdsaCurve::P256) => 72,
            Self::Ecdsa(EcdsaCurve::P384) => 104,
            Self::MlDsa(MlDsaLevel::MlDsa44) => 2420,
            Self::MlDsa(MlDsaLevel::MlDsa65) => 3309,
            Self::MlDsa(MlDsaLevel::MlDsa87) => 4627,
        }
    }

    /// Whether the algorithm is a post-quantum signature.
    pub fn is_post_quantum(self) -> bool {
        self.family() == SignatureFamily::MlDsa
    }

    /// Scheme a signer with this key would pick when the verifier allows it.
    pub fn natural_scheme(self) -> SignatureScheme {
        match self {
            Self::Rsa(RsaKeySize::Rsa2048) => SignatureScheme::RsaPssRsaeSha256,
            Self::Rsa(RsaKeySize::Rsa3072) => SignatureScheme::RsaPssRsaeSha384,
            Self::Rsa(RsaKeySize::Rsa4096) => SignatureScheme::RsaPssRsaeSha512,
            Self::Ecdsa(EcdsaCurve::P256) => SignatureScheme::EcdsaSecp256r1Sha256,
            Self::Ecdsa(EcdsaCurve::P384) => SignatureScheme::EcdsaSecp384r1Sha384,
            Self::MlDsa(MlDsaLevel::MlDsa44) => SignatureScheme::MlDsa44,
            Self::MlDsa(MlDsaLevel::MlDsa65) => SignatureScheme::MlDsa65,
            Self::MlDsa(MlDsaLevel::MlDsa87) => SignatureScheme::MlDsa87,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `SignatureScheme` values from the `signature_algorithms` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// `rsa_pss_rsae_sha256`
    RsaPssRsaeSha256,
    /// `rsa_pss_rsae_sha384`
    RsaPssRsaeSha384,
    /// `rsa_pss_rsae_sha512`
    RsaPssRsaeSha512,
    /// `ecdsa_secp256r1_sha256`
    EcdsaSecp256r1Sha256,
    /// `ecdsa_secp384r1_sha384`
    EcdsaSecp384r1Sha384,
    /// `mldsa44`
    MlDsa44,
    /// `mldsa65`
    MlDsa65,
    /// `mldsa87`
    MlDsa87,
}

impl SignatureScheme {
    /// Every supported scheme, post-quantum first as in the default config.
    pub const ALL: [Self; 8] = [
        Self::MlDsa44,
        Self::MlDsa65,
        Self::MlDsa87,
        Self::EcdsaSecp256r1Sha256,
        Self::EcdsaSecp384r1Sha384,
        Self::RsaPssRsaeSha256,
        Self::RsaPssRsaeSha384,
        Self::RsaPssRsaeSha512,
    ];

    /// Registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RsaPssRsaeSha256 => "rsa_pss_rsae_sha256",
            Self::RsaPssRsaeSha384 => "rsa_pss_rsae_sha384",
            Self::RsaPssRsaeSha512 => "rsa_pss_rsae_sha512",
            Self::EcdsaSecp256r1Sha256 => "ecdsa_secp256r1_sha256",
            Self::EcdsaSecp384r1Sha384 => "ecdsa_secp384r1_sha384",
            Self::MlDsa44 => "mldsa44",
            Self::MlDsa65 => "mldsa65",
            Self::MlDsa87 => "mldsa87",
        }
    }

    /// Look up a scheme by registry name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scheme| scheme.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Two-byte code point.
    pub fn code(self) -> u16 {
        match self {
            Self::RsaPssRsaeSha256 => 0x0804,
            Self::RsaPssRsaeSha384 => 0x0805,
            Self::RsaPssRsaeSha512 => 0x0806,
            Self::EcdsaSecp256r1Sha256 => 0x0403,
            Self::EcdsaSecp384r1Sha384 => 0x0503,
            Self::MlDsa44 => 0x0904,
            Self::MlDsa65 => 0x0905,
            Self::MlDsa87 => 0x0906,
        }
    }

    /// Family of keys this scheme can verify.
    pub fn family(self) -> SignatureFamily {
        match self {
            Self::RsaPssRsaeSha256 | Self::RsaPssRsaeSha384 | Self::RsaPssRsaeSha512 => {
                SignatureFamily::Rsa
            },
            Self::EcdsaSecp256r1Sha256 | Self::EcdsaSecp384r1Sha384 => SignatureFamily::Ecdsa,
            Self::MlDsa44 | Self::MlDsa65 | Self::MlDsa87 => SignatureFamily::MlDsa,
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
