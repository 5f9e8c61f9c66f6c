//! Parameter selection and the negotiation outcome.
//!
//! Selection is pure: the client's preference order decides, the server's set
//! only filters. A failed negotiation is a [`NegotiationResult::Failed`] value,
//! not an error.

use std::fmt;

use serde::Serialize;
use tlsim_proto::{
    CipherSuite, KeyExchangeGroup, SignatureAlgorithm, SignatureIdentity, SignatureScheme,
};

/// Why a handshake failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    /// Client and server share no cipher suite
    NoCommonCipherSuite,
    /// Client and server share no key exchange group
    NoCommonGroup,
    /// Server requires a client certificate and the client has none
    ClientCertificateRequiredButAbsent,
    /// A presented chain does not lead to a trusted root
    CertificateChainInvalid,
    /// The verifier supports no scheme of the identity's signature family
    SignatureAlgorithmMismatch,
    /// The server has no identity to present
    ServerCertificateAbsent,
}

impl FailureReason {
    /// Short description for logs and tables.
    pub fn description(self) -> &'static str {
        match self {
            Self::NoCommonCipherSuite => "no common cipher suite",
            Self::NoCommonGroup => "no common key exchange group",
            Self::ClientCertificateRequiredButAbsent => "client certificate required but absent",
            Self::CertificateChainInvalid => "certificate chain invalid",
            Self::SignatureAlgorithmMismatch => "signature algorithm mismatch",
            Self::ServerCertificateAbsent => "server certificate absent",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Parameters of an established session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Established {
    /// Negotiated cipher suite
    pub suite: CipherSuite,
    /// Negotiated key exchange group
    pub group: KeyExchangeGroup,
    /// Identity the server authenticated with
    pub server_identity: SignatureIdentity,
    /// Scheme of the server `CertificateVerify`
    pub server_scheme: SignatureScheme,
    /// Identity the client authenticated with, if any
    pub client_identity: Option<SignatureIdentity>,
    /// Scheme of the client `CertificateVerify`, if any
    pub client_scheme: Option<SignatureScheme>,
}

/// Terminal outcome of a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NegotiationResult {
    /// Handshake completed
    Established(Established),
    /// Handshake aborted
    Failed {
        /// Failure category
        reason: FailureReason,
        /// Extra detail, such as a chain-of-trust explanation
        detail: Option<String>,
    },
}

impl NegotiationResult {
    /// `true` for an established session.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established(_))
    }

    /// Session parameters, if established.
    pub fn established(&self) -> Option<&Established> {
        match self {
            Self::Established(established) => Some(established),
            Self::Failed { .. } => None,
        }
    }

    /// Failure reason, if failed.
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            Self::Established(_) => None,
            Self::Failed { reason, .. } => Some(*reason),
        }
    }
}

impl fmt::Display for NegotiationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Established(e) => {
                write!(f, "Established: {} / {} / {}", e.suite, e.group, e.server_scheme.name())?;
                if let Some(scheme) = e.client_scheme {
                    write!(f, " / client {}", scheme.name())?;
                }
                Ok(())
            },
            Self::Failed { reason, detail: None } => write!(f, "Negotiation Failed: {reason}"),
            Self::Failed { reason, detail: Some(detail) } => {
                write!(f, "Negotiation Failed: {reason} ({detail})")
            },
        }
    }
}

/// First client suite the server also enables.
pub fn select_cipher_suite(client: &[CipherSuite], server: &[CipherSuite]) -> Option<CipherSuite> {
    client.iter().copied().find(|suite| server.contains(suite))
}

/// First client group the server also enables.
pub fn select_group(
    client: &[KeyExchangeGroup],
    server: &[KeyExchangeGroup],
) -> Option<KeyExchangeGroup> {
    client.iter().copied().find(|group| server.contains(group))
}

/// Scheme for signing with `algorithm` that the verifier accepts.
///
/// The algorithm's own scheme wins if the verifier lists it; otherwise the
/// first listed scheme of the same family is used. `None` if the verifier
/// supports nothing in the family.
pub fn select_signature_scheme(
    algorithm: SignatureAlgorithm,
    verifier: &[SignatureScheme],
) -> Option<SignatureScheme> {
    let natural = algorithm.natural_scheme();
    if verifier.contains(&natural) {
        return Some(natural);
    }
    verifier.iter().copied().find(|scheme| scheme.family() == algorithm.family())
}
