//! Endpoint identities, certificate chains and trust stores.
//!
//! The simulator ships one demo root CA per [`SignatureAlgorithm`]. A standard
//! identity is a single leaf certificate issued by the demo root of its own
//! algorithm, so the CA type always mirrors the identity's family. Custom
//! chains can be built for chain-of-trust experiments.

use serde::{Deserialize, Serialize};

use crate::signature::SignatureAlgorithm;

/// One certificate in a chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Certificate {
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Algorithm of the subject public key
    pub key_algorithm: SignatureAlgorithm,
    /// Algorithm of the issuer key that signed this certificate
    pub signed_with: SignatureAlgorithm,
}

impl Certificate {
    /// Encoded size: subject key, issuer signature and fixed X.509 overhead.
    pub fn encoded_len(&self) -> usize {
        const X509_OVERHEAD: usize = 180;
        X509_OVERHEAD
            + self.subject.len()
            + self.issuer.len()
            + self.key_algorithm.public_key_len()
            + self.signed_with.signature_len()
    }
}

/// Certificates presented by an endpoint, leaf first. The root is not sent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CertificateChain(Vec<Certificate>);

impl CertificateChain {
    /// Build a chain from leaf-first certificates.
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self(certificates)
    }

    /// End-entity certificate.
    pub fn leaf(&self) -> Option<&Certificate> {
        self.0.first()
    }

    /// Last certificate in the chain, whose issuer must be a trust anchor.
    pub fn top(&self) -> Option<&Certificate> {
        self.0.last()
    }

    /// All certificates, leaf first.
    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain has no certificates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total encoded size of the `Certificate` message body.
    pub fn encoded_len(&self) -> usize {
        // per-entry 3-byte length prefix + 2-byte empty extensions
        self.0.iter().map(|cert| cert.encoded_len() + 5).sum()
    }
}

/// Root certificate trusted by a verifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Root distinguished name
    pub name: String,
    /// Root key algorithm
    pub algorithm: SignatureAlgorithm,
}

impl TrustAnchor {
    /// Bundled demo root for `algorithm`.
    pub fn demo_root(algorithm: SignatureAlgorithm) -> Self {
        Self { name: format!("{} Root CA", algorithm.name()), algorithm }
    }

    /// Whether this anchor is exactly the bundled demo root of its algorithm.
    pub fn is_demo_root(&self) -> bool {
        *self == Self::demo_root(self.algorithm)
    }
}

/// Set of roots a verifier accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrustStore {
    /// Every bundled demo root.
    #[default]
    Bundled,
    /// Only the listed anchors.
    Anchors(Vec<TrustAnchor>),
}

impl TrustStore {
    /// Whether a root with this name and algorithm is trusted.
    pub fn trusts(&self, name: &str, algorithm: SignatureAlgorithm) -> bool {
        match self {
            Self::Bundled => TrustAnchor::demo_root(algorithm).name == name,
            Self::Anchors(anchors) => {
                anchors.iter().any(|anchor| anchor.name == name && anchor.algorithm == algorithm)
            },
        }
    }
}

/// Opaque reference to a private key. Key bytes come from the key source at
/// keygen time, never from the identity itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrivateKeyHandle(String);

impl PrivateKeyHandle {
    /// Handle with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label of the key.
    pub fn label(&self) -> &str {
        &self.0
    }
}

/// Certificate chain plus private key for one signature algorithm.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignatureIdentity {
    algorithm: SignatureAlgorithm,
    chain: CertificateChain,
    key: PrivateKeyHandle,
}

impl SignatureIdentity {
    /// Standard identity: one leaf issued by the demo root of `algorithm`.
    pub fn new(algorithm: SignatureAlgorithm) -> Self {
        let root = TrustAnchor::demo_root(algorithm);
        let leaf = Certificate {
            subject: format!("{} end-entity", algorithm.name()),
            issuer: root.name,
            key_algorithm: algorithm,
            signed_with: algorithm,
        };

        Self {
            algorithm,
            chain: CertificateChain::new(vec![leaf]),
            key: PrivateKeyHandle::new(format!("{}-key", algorithm.name().to_ascii_lowercase())),
        }
    }

    /// Identity with a caller-supplied chain.
    pub fn with_chain(
        algorithm: SignatureAlgorithm,
        chain: CertificateChain,
        key: PrivateKeyHandle,
    ) -> Self {
        Self { algorithm, chain, key }
    }

    /// Key algorithm of the identity.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Presented certificate chain.
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// Private key handle.
    pub fn key(&self) -> &PrivateKeyHandle {
        &self.key
    }

    /// Algorithm of the CA at the top of the chain. Falls back to the identity
    /// algorithm for an empty chain.
    pub fn ca_algorithm(&self) -> SignatureAlgorithm {
        self.chain.top().map_or(self.algorithm, |cert| cert.signed_with)
    }

    /// Whether this identity equals [`SignatureIdentity::new`] of its algorithm.
    pub fn is_standard(&self) -> bool {
        *self == Self::new(self.algorithm)
    }
}
