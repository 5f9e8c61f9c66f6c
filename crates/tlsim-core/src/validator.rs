//! Certificate chain checks.
//!
//! A chain is ordered leaf first. Each certificate must be issued by the next
//! one, signed with that certificate's key algorithm, and the last one must be
//! issued by a root in the verifier's trust store.

use thiserror::Error;
use tlsim_proto::{SignatureIdentity, TrustStore};

/// Why a presented chain was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No certificates were presented
    #[error("certificate chain is empty")]
    Empty,

    /// Leaf key does not match the identity's signing algorithm
    #[error("leaf certificate key does not match the signing key")]
    LeafKeyMismatch,

    /// Certificate at `depth` is not issued by the certificate above it
    #[error("certificate at depth {depth} is not issued by its parent")]
    BrokenLink {
        /// Depth of the child certificate (leaf is 0)
        depth: usize,
    },

    /// Certificate at `depth` is signed with a different algorithm than its
    /// issuer's key
    #[error("certificate at depth {depth} is signed with the wrong algorithm")]
    IssuerAlgorithmMismatch {
        /// Depth of the child certificate (leaf is 0)
        depth: usize,
    },

    /// Self-signed top certificate that is not a trusted root
    #[error("self-signed certificate {subject} is not trusted")]
    SelfSignedUntrusted {
        /// Subject of the self-signed certificate
        subject: String,
    },

    /// Issuer of the top certificate is not in the trust store
    #[error("issuer {issuer} is not in the trust store")]
    UntrustedRoot {
        /// Issuer name of the top certificate
        issuer: String,
    },
}

impl ChainError {
    /// Explanation shown next to a failed run.
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Empty | Self::UntrustedRoot { .. } => {
                "Chain of Trust: Unable to find issuer certificate. The CA that signed this \
                 certificate is not in the trusted store."
            },
            Self::SelfSignedUntrusted { .. } => {
                "Chain of Trust: Self-signed certificate not in trusted store. Add the CA \
                 certificate to verify this chain."
            },
            Self::BrokenLink { .. } => {
                "Chain of Trust: Certificate is not trusted. Verify the CA is correctly \
                 configured."
            },
            Self::LeafKeyMismatch | Self::IssuerAlgorithmMismatch { .. } => {
                "Chain of Trust: Certificate signature verification failed. The certificate \
                 may be corrupt or signed with an unsupported algorithm."
            },
        }
    }
}

/// Check the chain of `identity` against `trust`.
pub fn validate_chain(identity: &SignatureIdentity, trust: &TrustStore) -> Result<(), ChainError> {
    let certificates = identity.chain().certificates();
    let (Some(leaf), Some(top)) = (certificates.first(), certificates.last()) else {
        return Err(ChainError::Empty);
    };

    if leaf.key_algorithm != identity.algorithm() {
        return Err(ChainError::LeafKeyMismatch);
    }

    for (depth, pair) in certificates.windows(2).enumerate() {
        let (child, parent) = (&pair[0], &pair[1]);
        if child.issuer != parent.subject {
            return Err(ChainError::BrokenLink { depth });
        }
        if child.signed_with != parent.key_algorithm {
            return Err(ChainError::IssuerAlgorithmMismatch { depth });
        }
    }

    if trust.trusts(&top.issuer, top.signed_with) {
        return Ok(());
    }

    if top.subject == top.issuer {
        Err(ChainError::SelfSignedUntrusted { subject: top.subject.clone() })
    } else {
        Err(ChainError::UntrustedRoot { issuer: top.issuer.clone() })
    }
}
