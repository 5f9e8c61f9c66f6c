//! Record protection with the negotiated AEAD.
//!
//! The per-record nonce is the traffic IV XORed with the record sequence
//! number, and the AAD is the record header of the protected record.

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::{
    ChaCha20Poly1305,
    aead::{Aead, KeyInit, Nonce, Payload},
};
use tlsim_proto::CipherSuite;

use crate::{error::CryptoError, kdf::TrafficKeys};

/// Encrypt one record body. Output is ciphertext followed by the 16-byte tag.
pub fn seal(
    suite: CipherSuite,
    keys: &TrafficKeys,
    sequence: u64,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce = keys.nonce(sequence);
    match suite {
        CipherSuite::Aes128GcmSha256 => seal_with::<Aes128Gcm>(keys.key(), &nonce, aad, plaintext),
        CipherSuite::Aes256GcmSha384 => seal_with::<Aes256Gcm>(keys.key(), &nonce, aad, plaintext),
        CipherSuite::Chacha20Poly1305Sha256 => {
            seal_with::<ChaCha20Poly1305>(keys.key(), &nonce, aad, plaintext)
        },
    }
}

/// Decrypt one record body.
///
/// # Errors
///
/// - `CryptoError::DecryptionFailed` if the tag does not verify
pub fn open(
    suite: CipherSuite,
    keys: &TrafficKeys,
    sequence: u64,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce = keys.nonce(sequence);
    match suite {
        CipherSuite::Aes128GcmSha256 => open_with::<Aes128Gcm>(keys.key(), &nonce, aad, ciphertext),
        CipherSuite::Aes256GcmSha384 => open_with::<Aes256Gcm>(keys.key(), &nonce, aad, ciphertext),
        CipherSuite::Chacha20Poly1305Sha256 => {
            open_with::<ChaCha20Poly1305>(keys.key(), &nonce, aad, ciphertext)
        },
    }
}

fn cipher<C: KeyInit>(key: &[u8]) -> Result<C, CryptoError> {
    C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength { cipher: std::any::type_name::<C>() })
}

fn seal_with<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8; 12],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    cipher::<C>(key)?
        .encrypt(Nonce::<C>::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

fn open_with<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8; 12],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    cipher::<C>(key)?
        .decrypt(Nonce::<C>::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}
