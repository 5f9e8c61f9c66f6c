//! Signatures for `CertificateVerify`.
//!
//! ECDSA P-256 and P-384 are real (RFC 6979 deterministic nonces, DER
//! encoded) and verify from the encoded public key alone.
//!
//! RSA-PSS and ML-DSA are simulated: the signature is HKDF keyed by the
//! private seed over the message digest, expanded to the algorithm's real
//! signature size. A simulated verifier must hold the signer's seed, so a
//! signature cannot be produced from the public key.

use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use sha2::Sha256;
use tlsim_proto::{EcdsaCurve, HashAlgorithm, SignatureAlgorithm};
use zeroize::Zeroizing;

use crate::{error::CryptoError, kdf, kex::SEED_LEN};

const PUBLIC_LABEL: &[u8] = b"tlsim sig public";
const SIGNATURE_LABEL: &[u8] = b"tlsim signature";

/// Context string for a server `CertificateVerify`.
pub const SERVER_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";

/// Context string for a client `CertificateVerify`.
pub const CLIENT_CONTEXT: &[u8] = b"TLS 1.3, client CertificateVerify";

fn expand(
    salt: &[u8],
    ikm: &[u8],
    label: &[u8],
    algorithm: SignatureAlgorithm,
    len: usize,
) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut info = Vec::with_capacity(label.len() + algorithm.name().len());
    info.extend_from_slice(label);
    info.extend_from_slice(algorithm.name().as_bytes());

    let mut out = vec![0u8; len];
    let Ok(()) = hk.expand(&info, &mut out) else {
        unreachable!("signature and key sizes are below the HKDF-SHA256 limit");
    };
    out
}

/// Content covered by a `CertificateVerify` signature (RFC 8446 §4.4.3):
/// 64 spaces, the context string, a zero byte, and the transcript hash.
pub fn signed_content(context: &[u8], transcript_hash: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(64 + context.len() + 1 + transcript_hash.len());
    content.extend_from_slice(&[0x20; 64]);
    content.extend_from_slice(context);
    content.push(0);
    content.extend_from_slice(transcript_hash);
    content
}

enum Signer {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    Simulated(Zeroizing<[u8; SEED_LEN]>),
}

/// Identity signing key.
pub struct SigningKey {
    algorithm: SignatureAlgorithm,
    signer: Signer,
    public: Vec<u8>,
}

impl SigningKey {
    /// Derive a key from a secret seed.
    pub fn generate(algorithm: SignatureAlgorithm, seed: &[u8; SEED_LEN]) -> Self {
        match algorithm {
            SignatureAlgorithm::Ecdsa(EcdsaCurve::P256) => {
                let key = p256::ecdsa::SigningKey::random(&mut ChaCha20Rng::from_seed(*seed));
                let point = p256::PublicKey::from(key.verifying_key()).to_encoded_point(false);
                let public = point.as_bytes().to_vec();
                Self { algorithm, signer: Signer::P256(key), public }
            },
            SignatureAlgorithm::Ecdsa(EcdsaCurve::P384) => {
                let key = p384::ecdsa::SigningKey::random(&mut ChaCha20Rng::from_seed(*seed));
                let point = p384::PublicKey::from(key.verifying_key()).to_encoded_point(false);
                let public = point.as_bytes().to_vec();
                Self { algorithm, signer: Signer::P384(key), public }
            },
            SignatureAlgorithm::Rsa(_) | SignatureAlgorithm::MlDsa(_) => {
                let public =
                    expand(seed, &[], PUBLIC_LABEL, algorithm, algorithm.public_key_len());
                Self { algorithm, signer: Signer::Simulated(Zeroizing::new(*seed)), public }
            },
        }
    }

    /// Algorithm of the key.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Encoded public key.
    pub fn public(&self) -> &[u8] {
        &self.public
    }

    /// `true` for the size-accurate RSA-PSS and ML-DSA stand-ins.
    pub fn is_simulated(&self) -> bool {
        matches!(self.signer, Signer::Simulated(_))
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        use p256::ecdsa::signature::Signer as _;

        match &self.signer {
            Signer::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            },
            Signer::P384(key) => {
                let signature: p384::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            },
            Signer::Simulated(seed) => simulated_signature(self.algorithm, seed.as_ref(), message),
        }
    }

    /// Verifier for signatures made with this key.
    pub fn verifying_key(&self) -> VerifyingKey {
        match &self.signer {
            Signer::P256(key) => VerifyingKey::P256(*key.verifying_key()),
            Signer::P384(key) => VerifyingKey::P384(*key.verifying_key()),
            Signer::Simulated(seed) => VerifyingKey::Simulated {
                algorithm: self.algorithm,
                seed: seed.clone(),
                public: self.public.clone(),
            },
        }
    }
}

fn simulated_signature(algorithm: SignatureAlgorithm, seed: &[u8], message: &[u8]) -> Vec<u8> {
    // hash first so ikm stays small for large messages
    let digest = kdf::transcript_hash(HashAlgorithm::Sha256, message);
    expand(seed, &digest, SIGNATURE_LABEL, algorithm, algorithm.signature_len())
}

/// Public half of a [`SigningKey`].
pub enum VerifyingKey {
    /// ECDSA over P-256
    P256(p256::ecdsa::VerifyingKey),
    /// ECDSA over P-384
    P384(p384::ecdsa::VerifyingKey),
    /// RSA-PSS or ML-DSA stand-in keyed by the signer's seed
    Simulated {
        /// Algorithm the signatures pose as
        algorithm: SignatureAlgorithm,
        /// Signer's seed
        seed: Zeroizing<[u8; SEED_LEN]>,
        /// Encoded public key
        public: Vec<u8>,
    },
}

impl VerifyingKey {
    /// ECDSA verifier from an uncompressed SEC 1 point.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidPublicKey` for a key that does not decode, or an
    ///   algorithm that has no public-key-only verifier
    pub fn from_public(algorithm: SignatureAlgorithm, public: &[u8]) -> Result<Self, CryptoError> {
        let invalid = CryptoError::InvalidPublicKey { kind: algorithm.name() };
        match algorithm {
            SignatureAlgorithm::Ecdsa(EcdsaCurve::P256) => {
                p256::ecdsa::VerifyingKey::from_sec1_bytes(public)
                    .map(Self::P256)
                    .map_err(|_| invalid)
            },
            SignatureAlgorithm::Ecdsa(EcdsaCurve::P384) => {
                p384::ecdsa::VerifyingKey::from_sec1_bytes(public)
                    .map(Self::P384)
                    .map_err(|_| invalid)
            },
            SignatureAlgorithm::Rsa(_) | SignatureAlgorithm::MlDsa(_) => Err(invalid),
        }
    }

    /// Algorithm of the key.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::P256(_) => SignatureAlgorithm::Ecdsa(EcdsaCurve::P256),
            Self::P384(_) => SignatureAlgorithm::Ecdsa(EcdsaCurve::P384),
            Self::Simulated { algorithm, .. } => *algorithm,
        }
    }

    /// Verify `signature` over `message`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::SignatureInvalid` on any mismatch
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        use p256::ecdsa::signature::Verifier as _;

        let invalid = CryptoError::SignatureInvalid { algorithm: self.algorithm().name() };
        match self {
            Self::P256(key) => {
                let signature =
                    p256::ecdsa::Signature::from_der(signature).map_err(|_| invalid.clone())?;
                key.verify(message, &signature).map_err(|_| invalid)
            },
            Self::P384(key) => {
                let signature =
                    p384::ecdsa::Signature::from_der(signature).map_err(|_| invalid.clone())?;
                key.verify(message, &signature).map_err(|_| invalid)
            },
            Self::Simulated { algorithm, seed, .. } => {
                if simulated_signature(*algorithm, seed.as_ref(), message) == signature {
                    Ok(())
                } else {
                    Err(invalid)
                }
            },
        }
    }
}
