//! Cryptographic services for the tlsim handshake simulator.
//!
//! Pure functions with deterministic outputs. Callers supply all randomness
//! (key seeds, encapsulation coins) so a run can be replayed byte for byte.
//!
//! # What is real and what is simulated
//!
//! ```text
//! X25519, P-256, P-384    real        x25519-dalek, p256, p384 ECDH
//! ML-KEM-768              real        ml-kem keygen / encapsulate / decapsulate
//! ECDSA signatures        real        p256 / p384 ecdsa, DER encoded
//! RSA-PSS, ML-DSA         simulated   HKDF keyed by the signing seed
//! key schedule            real        HKDF-Extract / HKDF-Expand-Label (RFC 8446 §7.1)
//! traffic keys            real        expand_label("key"/"iv")
//! Finished                real        HMAC(finished_key, transcript hash)
//! record protection       real        AES-GCM / ChaCha20-Poly1305, nonce = iv XOR seq
//! ```
//!
//! The simulated signatures have the real signature and public key sizes of
//! their algorithm, so record and packet sizes match a real stack.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod kdf;
pub mod kex;
pub mod sign;

pub use aead::{open, seal};
pub use error::CryptoError;
pub use kdf::{ApplicationSecrets, HandshakeSecrets, TrafficKeys, TrafficSecret};
pub use kex::{Encapsulation, KeyPair, SEED_LEN};
pub use sign::{SigningKey, VerifyingKey, signed_content};
