//! Per-endpoint negotiation policy.

use serde::{Deserialize, Serialize};

use crate::{
    group::KeyExchangeGroup,
    identity::{SignatureIdentity, TrustStore},
    signature::{RsaKeySize, SignatureAlgorithm, SignatureScheme},
    suite::CipherSuite,
};

/// Whether a server asks the client for a certificate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ClientAuth {
    /// No `CertificateRequest`.
    #[default]
    Off,
    /// Ask for a certificate, continue anonymously without one.
    Request,
    /// Ask for a certificate, fail the handshake without one.
    Require,
}

/// Immutable negotiation policy for one side of a connection.
///
/// Lists are in preference order, first entry most preferred. Empty suite or
/// group lists are valid values; they make negotiation fail rather than
/// construction. Every `with_*` method returns a new policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointPolicy {
    cipher_suites: Vec<CipherSuite>,
    groups: Vec<KeyExchangeGroup>,
    signature_schemes: Vec<SignatureScheme>,
    identity: Option<SignatureIdentity>,
    client_auth: ClientAuth,
    trust: TrustStore,
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self {
            cipher_suites: CipherSuite::ALL.to_vec(),
            groups: vec![KeyExchangeGroup::X25519, KeyExchangeGroup::P256, KeyExchangeGroup::P384],
            signature_schemes: SignatureScheme::ALL.to_vec(),
            identity: None,
            client_auth: ClientAuth::Off,
            trust: TrustStore::Bundled,
        }
    }
}

impl EndpointPolicy {
    /// Default policy plus the bundled RSA-2048 server certificate.
    ///
    /// [`EndpointPolicy::default`] presents no identity, which suits a client
    /// but makes every handshake fail once the server must authenticate.
    pub fn default_server() -> Self {
        let identity = SignatureIdentity::new(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048));
        Self { identity: Some(identity), ..Self::default() }
    }

    /// Start a builder from the default policy.
    pub fn builder() -> EndpointPolicyBuilder {
        EndpointPolicyBuilder { policy: Self::default() }
    }

    /// Enabled cipher suites, most preferred first.
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Enabled key exchange groups, most preferred first.
    pub fn groups(&self) -> &[KeyExchangeGroup] {
        &self.groups
    }

    /// Signature schemes this endpoint accepts from its peer.
    pub fn signature_schemes(&self) -> &[SignatureScheme] {
        &self.signature_schemes
    }

    /// Identity presented to the peer, if any.
    pub fn identity(&self) -> Option<&SignatureIdentity> {
        self.identity.as_ref()
    }

    /// Client authentication mode. Only the server's value is consulted.
    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    /// Whether a missing client certificate fails the handshake.
    pub fn require_client_certificate(&self) -> bool {
        self.client_auth == ClientAuth::Require
    }

    /// Roots used to verify the peer's chain.
    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    /// Copy with a different suite list.
    #[must_use]
    pub fn with_cipher_suites(&self, suites: impl IntoIterator<Item = CipherSuite>) -> Self {
        Self { cipher_suites: suites.into_iter().collect(), ..self.clone() }
    }

    /// Copy with a different group list.
    #[must_use]
    pub fn with_groups(&self, groups: impl IntoIterator<Item = KeyExchangeGroup>) -> Self {
        Self { groups: groups.into_iter().collect(), ..self.clone() }
    }

    /// Copy with a different accepted scheme list.
    #[must_use]
    pub fn with_signature_schemes(
        &self,
        schemes: impl IntoIterator<Item = SignatureScheme>,
    ) -> Self {
        Self { signature_schemes: schemes.into_iter().collect(), ..self.clone() }
    }

    /// Copy with a different identity.
    #[must_use]
    pub fn with_identity(&self, identity: Option<SignatureIdentity>) -> Self {
        Self { identity, ..self.clone() }
    }

    /// Copy with a different client authentication mode.
    #[must_use]
    pub fn with_client_auth(&self, client_auth: ClientAuth) -> Self {
        Self { client_auth, ..self.clone() }
    }

    /// Copy with a different trust store.
    #[must_use]
    pub fn with_trust(&self, trust: TrustStore) -> Self {
        Self { trust, ..self.clone() }
    }
}

/// Builder for [`EndpointPolicy`], starting from the defaults.
#[derive(Debug, Clone)]
pub struct EndpointPolicyBuilder {
    policy: EndpointPolicy,
}

impl EndpointPolicyBuilder {
    /// Set enabled cipher suites.
    #[must_use]
    pub fn cipher_suites(mut self, suites: impl IntoIterator<Item = CipherSuite>) -> Self {
        self.policy.cipher_suites = suites.into_iter().collect();
        self
    }

    /// Set enabled groups.
    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = KeyExchangeGroup>) -> Self {
        self.policy.groups = groups.into_iter().collect();
        self
    }

    /// Set accepted signature schemes.
    #[must_use]
    pub fn signature_schemes(mut self, schemes: impl IntoIterator<Item = SignatureScheme>) -> Self {
        self.policy.signature_schemes = schemes.into_iter().collect();
        self
    }

    /// Set the presented identity.
    #[must_use]
    pub fn identity(mut self, identity: SignatureIdentity) -> Self {
        self.policy.identity = Some(identity);
        self
    }

    /// Present no identity.
    #[must_use]
    pub fn no_identity(mut self) -> Self {
        self.policy.identity = None;
        self
    }

    /// Set client authentication mode.
    #[must_use]
    pub fn client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.policy.client_auth = client_auth;
        self
    }

    /// Set the trust store.
    #[must_use]
    pub fn trust(mut self, trust: TrustStore) -> Self {
        self.policy.trust = trust;
        self
    }

    /// Finish building.
    pub fn build(self) -> EndpointPolicy {
        self.policy
    }
}
