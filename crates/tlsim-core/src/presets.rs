//! Guided exercise configurations.
//!
//! Each preset is a client/server policy pair that isolates one migration
//! step, from a classical baseline to a fully post-quantum handshake. Running
//! them in order through one [`crate::Simulator`] builds a comparison table of
//! their overhead.

use tlsim_proto::{
    CipherSuite, ClientAuth, EndpointPolicy, KeyExchangeGroup, MlDsaLevel, RsaKeySize,
    SignatureAlgorithm, SignatureIdentity, SignatureScheme, TrustAnchor, TrustStore,
};

/// A named client/server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    /// Short identifier, e.g. `basic-rsa`
    pub id: &'static str,
    /// One-line title
    pub title: &'static str,
    /// What the run demonstrates
    pub observe: &'static str,
    /// Client policy
    pub client: EndpointPolicy,
    /// Server policy
    pub server: EndpointPolicy,
}

const RSA: SignatureAlgorithm = SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048);
const MLDSA87: SignatureAlgorithm = SignatureAlgorithm::MlDsa(MlDsaLevel::MlDsa87);
const CLASSICAL_SCHEMES: [SignatureScheme; 2] =
    [SignatureScheme::RsaPssRsaeSha256, SignatureScheme::EcdsaSecp256r1Sha256];

fn endpoint(
    group: KeyExchangeGroup,
    schemes: &[SignatureScheme],
    identity: SignatureAlgorithm,
) -> EndpointPolicy {
    EndpointPolicy::builder()
        .cipher_suites([CipherSuite::Aes256GcmSha384])
        .groups([group])
        .signature_schemes(schemes.iter().copied())
        .identity(SignatureIdentity::new(identity))
        .trust(TrustStore::Anchors(vec![TrustAnchor::demo_root(identity)]))
        .build()
}

/// Every preset in exercise order.
pub fn all() -> Vec<Preset> {
    let pqc_schemes = [SignatureScheme::MlDsa87, SignatureScheme::RsaPssRsaeSha256];
    vec![
        Preset {
            id: "basic-rsa",
            title: "Basic RSA handshake",
            observe: "Baseline size with RSA-2048 certificates and X25519",
            client: endpoint(KeyExchangeGroup::X25519, &CLASSICAL_SCHEMES, RSA),
            server: endpoint(KeyExchangeGroup::X25519, &CLASSICAL_SCHEMES, RSA),
        },
        Preset {
            id: "pqc-certs",
            title: "PQC certificates (ML-DSA-87)",
            observe: "ML-DSA-87 signatures inflate Certificate and CertificateVerify",
            client: endpoint(KeyExchangeGroup::X25519, &pqc_schemes, MLDSA87),
            server: endpoint(KeyExchangeGroup::X25519, &pqc_schemes, MLDSA87),
        },
        Preset {
            id: "hybrid-kex",
            title: "Hybrid key exchange",
            observe: "The ML-KEM-768 key share grows both hellos",
            client: endpoint(KeyExchangeGroup::MlKem768, &CLASSICAL_SCHEMES, RSA),
            server: endpoint(KeyExchangeGroup::MlKem768, &CLASSICAL_SCHEMES, RSA),
        },
        Preset {
            id: "full-pqc",
            title: "Full PQC (ML-DSA-87 + ML-KEM-768)",
            observe: "Largest handshake: post-quantum signatures and key exchange",
            client: endpoint(KeyExchangeGroup::MlKem768, &[SignatureScheme::MlDsa87], MLDSA87),
            server: endpoint(KeyExchangeGroup::MlKem768, &[SignatureScheme::MlDsa87], MLDSA87),
        },
        Preset {
            id: "mtls",
            title: "Mutual TLS",
            observe: "The client certificate flight adds a second chain and signature",
            client: endpoint(KeyExchangeGroup::X25519, &CLASSICAL_SCHEMES, RSA),
            server: endpoint(KeyExchangeGroup::X25519, &CLASSICAL_SCHEMES, RSA)
                .with_client_auth(ClientAuth::Require),
        },
    ]
}

/// Preset by id.
pub fn find(id: &str) -> Option<Preset> {
    all().into_iter().find(|preset| preset.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_findable() {
        let presets = all();
        for preset in &presets {
            assert_eq!(find(preset.id).map(|p| p.id), Some(preset.id));
        }
        let mut ids: Vec<_> = presets.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), presets.len());
        assert!(find("nope").is_none());
    }

    #[test]
    fn only_mtls_requires_a_client_certificate() {
        let requiring: Vec<_> =
            all().into_iter().filter(|p| p.server.require_client_certificate()).collect();
        assert_eq!(requiring.len(), 1);
        assert_eq!(requiring[0].id, "mtls");
    }
}
