//! Ephemeral key agreement.
//!
//! X25519 (RFC 7748), P-256 and P-384 ECDH (SEC 1 uncompressed points) and
//! ML-KEM-768 (FIPS 203). All key material comes from a caller-supplied
//! 32-byte seed, so a run replays exactly:
//!
//! - X25519 uses the seed as the private scalar (clamped by the curve code)
//! - P-256, P-384 and ML-KEM draw their keys from a ChaCha20 stream keyed by the
//!   seed
//! - ML-KEM encapsulation draws its message from a stream keyed by the coins

use kem::{Decapsulate, Encapsulate};
use ml_kem::{
    EncodedSizeUser, KemCore, MlKem768, MlKem768Params,
    kem::{DecapsulationKey, EncapsulationKey},
};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use tlsim_proto::{KexMechanism, KeyExchangeGroup};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Length of key seeds and encapsulation coins.
pub const SEED_LEN: usize = 32;

const ML_KEM_768_DK_LEN: usize = 2400;

enum Secret {
    X25519(x25519_dalek::StaticSecret),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    MlKem768(Zeroizing<Vec<u8>>),
}

/// Ephemeral key pair for one group.
pub struct KeyPair {
    group: KeyExchangeGroup,
    secret: Secret,
    public: Vec<u8>,
}

impl KeyPair {
    /// Derive a key pair from a secret seed.
    ///
    /// The public part is the client share: an encoded point for ECDH groups,
    /// the encapsulation key for ML-KEM.
    pub fn generate(group: KeyExchangeGroup, seed: &[u8; SEED_LEN]) -> Self {
        match group {
            KeyExchangeGroup::X25519 => {
                let secret = x25519_dalek::StaticSecret::from(*seed);
                let public = x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec();
                Self { group, secret: Secret::X25519(secret), public }
            },
            KeyExchangeGroup::P256 => {
                let secret = p256::SecretKey::random(&mut ChaCha20Rng::from_seed(*seed));
                let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                Self { group, secret: Secret::P256(secret), public }
            },
            KeyExchangeGroup::P384 => {
                let secret = p384::SecretKey::random(&mut ChaCha20Rng::from_seed(*seed));
                let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                Self { group, secret: Secret::P384(secret), public }
            },
            KeyExchangeGroup::MlKem768 => {
                let (dk, ek) = MlKem768::generate(&mut ChaCha20Rng::from_seed(*seed));
                let secret = Zeroizing::new(dk.as_bytes().to_vec());
                let public = ek.as_bytes().to_vec();
                Self { group, secret: Secret::MlKem768(secret), public }
            },
        }
    }

    /// Group of the key pair.
    pub fn group(&self) -> KeyExchangeGroup {
        self.group
    }

    /// Public share sent in `key_share`.
    pub fn public(&self) -> &[u8] {
        &self.public
    }

    /// Length of the encoded private key.
    pub fn secret_len(&self) -> usize {
        match &self.secret {
            Secret::X25519(_) | Secret::P256(_) => 32,
            Secret::P384(_) => 48,
            Secret::MlKem768(dk) => dk.len(),
        }
    }

    /// ECDH with the peer's public share.
    ///
    /// # Errors
    ///
    /// - `CryptoError::ShareLengthMismatch` if the peer share has the wrong
    ///   length for the group, or the group is a KEM
    /// - `CryptoError::InvalidPublicKey` if the share is not a valid point
    pub fn agree(&self, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let expected = self.group.server_share_len();
        if self.group.mechanism() != KexMechanism::Ecdh || peer_public.len() != expected {
            return Err(CryptoError::ShareLengthMismatch { expected, actual: peer_public.len() });
        }
        let invalid = || CryptoError::InvalidPublicKey { kind: self.group.name() };

        let shared = match &self.secret {
            Secret::X25519(secret) => {
                let peer: [u8; 32] = peer_public.try_into().map_err(|_| invalid())?;
                let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
                // low-order peer points give the all-zero secret
                if !shared.was_contributory() {
                    return Err(invalid());
                }
                shared.as_bytes().to_vec()
            },
            Secret::P256(secret) => {
                let point = p256::EncodedPoint::from_bytes(peer_public).map_err(|_| invalid())?;
                let peer =
                    p256::PublicKey::from_encoded_point(&point).into_option().ok_or_else(invalid)?;
                let shared =
                    p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                shared.raw_secret_bytes().to_vec()
            },
            Secret::P384(secret) => {
                let point = p384::EncodedPoint::from_bytes(peer_public).map_err(|_| invalid())?;
                let peer =
                    p384::PublicKey::from_encoded_point(&point).into_option().ok_or_else(invalid)?;
                let shared =
                    p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                shared.raw_secret_bytes().to_vec()
            },
            Secret::MlKem768(_) => return Err(invalid()),
        };
        Ok(Zeroizing::new(shared))
    }

    /// KEM decapsulation of a server ciphertext.
    ///
    /// # Errors
    ///
    /// - `CryptoError::ShareLengthMismatch` if the ciphertext has the wrong
    ///   length, or the group is not a KEM
    /// - `CryptoError::KemFailed` if decapsulation fails
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let expected = self.group.server_share_len();
        let Secret::MlKem768(dk_bytes) = &self.secret else {
            return Err(CryptoError::ShareLengthMismatch { expected, actual: ciphertext.len() });
        };
        let ct: &[u8; 1088] = ciphertext
            .try_into()
            .map_err(|_| CryptoError::ShareLengthMismatch { expected, actual: ciphertext.len() })?;
        let dk: &[u8; ML_KEM_768_DK_LEN] =
            dk_bytes.as_slice().try_into().map_err(|_| CryptoError::KemFailed)?;

        let dk = DecapsulationKey::<MlKem768Params>::from_bytes(&(*dk).into());
        let shared = dk.decapsulate(&(*ct).into()).map_err(|_| CryptoError::KemFailed)?;
        Ok(Zeroizing::new(shared.to_vec()))
    }
}

/// Server side of a KEM exchange.
pub struct Encapsulation {
    /// Ciphertext sent back in the server `key_share`
    pub ciphertext: Vec<u8>,
    /// Shared secret
    pub shared_secret: Zeroizing<Vec<u8>>,
}

impl Encapsulation {
    /// Encapsulate to the client's encapsulation key using `coins`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::ShareLengthMismatch` if the key has the wrong length,
    ///   or the group is not a KEM
    /// - `CryptoError::KemFailed` if encapsulation fails
    pub fn encapsulate(
        group: KeyExchangeGroup,
        encapsulation_key: &[u8],
        coins: &[u8; SEED_LEN],
    ) -> Result<Self, CryptoError> {
        let expected = group.client_share_len();
        let actual = encapsulation_key.len();
        let mismatch = CryptoError::ShareLengthMismatch { expected, actual };
        if group.mechanism() != KexMechanism::Kem {
            return Err(mismatch);
        }
        let ek: &[u8; 1184] = encapsulation_key.try_into().map_err(|_| mismatch)?;

        let ek = EncapsulationKey::<MlKem768Params>::from_bytes(&(*ek).into());
        let (ciphertext, shared) = ek
            .encapsulate(&mut ChaCha20Rng::from_seed(*coins))
            .map_err(|_| CryptoError::KemFailed)?;

        Ok(Self {
            ciphertext: ciphertext.to_vec(),
            shared_secret: Zeroizing::new(shared.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECDH: [KeyExchangeGroup; 3] =
        [KeyExchangeGroup::X25519, KeyExchangeGroup::P256, KeyExchangeGroup::P384];

    #[test]
    fn ecdh_agrees_both_ways() {
        for group in ECDH {
            let client = KeyPair::generate(group, &[1u8; 32]);
            let server = KeyPair::generate(group, &[2u8; 32]);

            let client_view = client.agree(server.public()).unwrap();
            let server_view = server.agree(client.public()).unwrap();

            assert_eq!(client_view, server_view);
            assert_eq!(client_view.len(), group.shared_secret_len());
            assert_eq!(client.public().len(), group.client_share_len());
        }
    }

    #[test]
    fn x25519_rfc7748_vector() {
        let alice: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let bob_public =
            hex::decode("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f")
                .unwrap();

        let pair = KeyPair::generate(KeyExchangeGroup::X25519, &alice);
        assert_eq!(
            hex::encode(pair.public()),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
        assert_eq!(
            hex::encode(pair.agree(&bob_public).unwrap().as_slice()),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }

    #[test]
    fn shared_secret_needs_a_private_key() {
        // a third party holding only public shares ends up elsewhere
        for group in ECDH {
            let client = KeyPair::generate(group, &[1u8; 32]);
            let server = KeyPair::generate(group, &[2u8; 32]);
            let eavesdropper = KeyPair::generate(group, &[3u8; 32]);

            let real = client.agree(server.public()).unwrap();
            assert_ne!(eavesdropper.agree(server.public()).unwrap(), real, "{group}");
            assert_ne!(eavesdropper.agree(client.public()).unwrap(), real, "{group}");
        }
    }

    #[test]
    fn kem_round_trip() {
        let group = KeyExchangeGroup::MlKem768;
        let client = KeyPair::generate(group, &[7u8; 32]);
        let encap = Encapsulation::encapsulate(group, client.public(), &[9u8; 32]).unwrap();

        assert_eq!(client.public().len(), 1184);
        assert_eq!(client.secret_len(), 2400);
        assert_eq!(encap.ciphertext.len(), 1088);
        assert_eq!(client.decapsulate(&encap.ciphertext).unwrap(), encap.shared_secret);
    }

    #[test]
    fn kem_decapsulation_needs_the_right_key() {
        let group = KeyExchangeGroup::MlKem768;
        let client = KeyPair::generate(group, &[7u8; 32]);
        let other = KeyPair::generate(group, &[8u8; 32]);
        let encap = Encapsulation::encapsulate(group, client.public(), &[9u8; 32]).unwrap();

        // implicit rejection: a wrong key yields an unrelated secret, not an error
        assert_ne!(other.decapsulate(&encap.ciphertext).unwrap(), encap.shared_secret);
    }

    #[test]
    fn same_seed_same_keys() {
        for group in KeyExchangeGroup::ALL {
            let a = KeyPair::generate(group, &[5u8; 32]);
            let b = KeyPair::generate(group, &[5u8; 32]);
            let c = KeyPair::generate(group, &[6u8; 32]);
            assert_eq!(a.public(), b.public(), "{group}");
            assert_ne!(a.public(), c.public(), "{group}");
        }
    }

    #[test]
    fn invalid_points_rejected() {
        let x25519 = KeyPair::generate(KeyExchangeGroup::X25519, &[1u8; 32]);
        assert_eq!(
            x25519.agree(&[0u8; 32]),
            Err(CryptoError::InvalidPublicKey { kind: "X25519" })
        );

        let p256 = KeyPair::generate(KeyExchangeGroup::P256, &[1u8; 32]);
        assert_eq!(
            p256.agree(&[0x04; 65]),
            Err(CryptoError::InvalidPublicKey { kind: "P-256" })
        );
    }

    #[test]
    fn mechanism_mismatch_rejected() {
        let kem = KeyPair::generate(KeyExchangeGroup::MlKem768, &[1u8; 32]);
        assert!(kem.agree(&[0u8; 1088]).is_err());

        let ecdh = KeyPair::generate(KeyExchangeGroup::X25519, &[1u8; 32]);
        assert!(ecdh.decapsulate(&[0u8; 32]).is_err());
        let encap = Encapsulation::encapsulate(KeyExchangeGroup::X25519, ecdh.public(), &[0u8; 32]);
        assert!(encap.is_err());
    }
}
