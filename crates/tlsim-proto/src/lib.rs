//! Value types for the tlsim TLS 1.3 handshake simulator.
//!
//! Everything in this crate is an immutable value: cipher suites, key exchange
//! groups, signature algorithms and schemes, identities with their certificate
//! chains, and the per-endpoint [`EndpointPolicy`] aggregate. Editing a policy
//! produces a new value, so a finished session can keep the exact policy it
//! ran with.
//!
//! Two wire-facing pieces live here as well:
//!
//! - [`config`]: the line-oriented text format that policy files use
//!   (`Ciphersuites = TLS_AES_256_GCM_SHA384:TLS_CHACHA20_POLY1305_SHA256`).
//! - [`record`]: the 5-byte TLS record header, parsed zero-copy.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod errors;
pub mod group;
pub mod identity;
pub mod policy;
pub mod record;
pub mod signature;
pub mod suite;

pub use errors::{ConfigError, ProtocolError, Result};
pub use group::{KexMechanism, KeyExchangeGroup};
pub use identity::{
    Certificate, CertificateChain, PrivateKeyHandle, SignatureIdentity, TrustAnchor, TrustStore,
};
pub use policy::{ClientAuth, EndpointPolicy, EndpointPolicyBuilder};
pub use record::{PayloadKind, RecordHeader, RecordType};
pub use signature::{
    EcdsaCurve, MlDsaLevel, RsaKeySize, SignatureAlgorithm, SignatureFamily, SignatureScheme,
};
pub use suite::{CipherSuite, HashAlgorithm};
