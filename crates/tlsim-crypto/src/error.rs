//! Crypto error types.

use thiserror::Error;

/// Errors from crypto service functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length for the cipher
    #[error("invalid key length for {cipher}")]
    InvalidKeyLength {
        /// Cipher that rejected the key
        cipher: &'static str,
    },

    /// Pseudorandom key shorter than the hash output
    #[error("invalid pseudorandom key length: {0}")]
    InvalidPrk(usize),

    /// HKDF-Expand output longer than 255 * HashLen
    #[error("HKDF output too long: {requested} bytes (max {max})")]
    OutputTooLong {
        /// Requested length
        requested: usize,
        /// Maximum for the hash
        max: usize,
    },

    /// AEAD seal failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD open failed: wrong key, nonce, AAD, or tampered ciphertext
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Peer share has the wrong length for the negotiated group
    #[error("key share length mismatch: expected {expected}, got {actual}")]
    ShareLengthMismatch {
        /// Length required by the group
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Public key or share does not decode to a valid key
    #[error("invalid public key for {kind}")]
    InvalidPublicKey {
        /// Group or signature algorithm name
        kind: &'static str,
    },

    /// ML-KEM encapsulation or decapsulation failed
    #[error("KEM operation failed")]
    KemFailed,

    /// Signature does not verify under the given public key
    #[error("signature verification failed for {algorithm}")]
    SignatureInvalid {
        /// Algorithm name
        algorithm: &'static str,
    },
}
