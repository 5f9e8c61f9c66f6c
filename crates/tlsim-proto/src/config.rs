//! Line-oriented policy text format.
//!
//! Modeled on an OpenSSL `system_default_sect` section:
//!
//! ```text
//! [system_default_sect]
//! MinProtocol = TLSv1.3
//! Ciphersuites = TLS_AES_256_GCM_SHA384:TLS_CHACHA20_POLY1305_SHA256
//! Groups = X25519:P-384
//! SignatureAlgorithms = mldsa44:ecdsa_secp256r1_sha256
//! Identity = ML-DSA-44
//! VerifyMode = Peer,Request
//! VerifyCAFile = bundled
//! ```
//!
//! Keys accept `=` or `:` as separator. Comments (`#`, `;`), section headers
//! and unknown keys are skipped. A missing key keeps the default value while
//! an empty value means an empty list.
//!
//! `VerifyMode` follows the OpenSSL flag words: `Peer` asks for a client
//! certificate, `Peer,Request` also fails the handshake without one.
//! `VerifyCAFile` is `bundled` or a colon-joined list of algorithm names whose
//! demo roots are trusted.

use std::fmt::Write as _;

use crate::{
    errors::ConfigError,
    group::KeyExchangeGroup,
    identity::{SignatureIdentity, TrustAnchor, TrustStore},
    policy::{ClientAuth, EndpointPolicy},
    signature::{SignatureAlgorithm, SignatureScheme},
    suite::CipherSuite,
};

const SECTION: &str = "system_default_sect";
const TLS13: &str = "TLSv1.3";
const BUNDLED: &str = "bundled";
const NO_IDENTITY: &str = "none";

/// Parse a policy file. Keys absent from the text keep their default.
pub fn parse(text: &str) -> Result<EndpointPolicy, ConfigError> {
    parse_onto(EndpointPolicy::default(), text)
}

/// Parse a policy file over `base`. Keys absent from the text keep the value
/// `base` has.
pub fn parse_onto(base: EndpointPolicy, text: &str) -> Result<EndpointPolicy, ConfigError> {
    let mut policy = base;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(['#', ';', '[']) {
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            return Err(ConfigError::MalformedLine { line: index + 1, content: raw.to_string() });
        };
        let key = line[..split].trim();
        let value = line[split + 1..].trim();

        policy = apply(policy, key, value)?;
    }

    Ok(policy)
}

fn apply(policy: EndpointPolicy, key: &str, value: &str) -> Result<EndpointPolicy, ConfigError> {
    let is = |name: &str| key.eq_ignore_ascii_case(name);

    if is("MinProtocol") || is("MaxProtocol") {
        if !value.eq_ignore_ascii_case(TLS13) {
            return Err(ConfigError::UnsupportedProtocol {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        Ok(policy)
    } else if is("Ciphersuites") {
        let suites = tokens(value, |t| {
            CipherSuite::from_iana_name(t).ok_or_else(|| ConfigError::UnknownCipherSuite(t.into()))
        })?;
        Ok(policy.with_cipher_suites(suites))
    } else if is("Groups") {
        let groups = tokens(value, |t| {
            KeyExchangeGroup::from_name(t).ok_or_else(|| ConfigError::UnknownGroup(t.into()))
        })?;
        Ok(policy.with_groups(groups))
    } else if is("SignatureAlgorithms") {
        let schemes = tokens(value, |t| {
            SignatureScheme::from_name(t)
                .ok_or_else(|| ConfigError::UnknownSignatureScheme(t.into()))
        })?;
        Ok(policy.with_signature_schemes(schemes))
    } else if is("Identity") {
        if value.eq_ignore_ascii_case(NO_IDENTITY) || value.is_empty() {
            return Ok(policy.with_identity(None));
        }
        let algorithm = algorithm(value)?;
        Ok(policy.with_identity(Some(SignatureIdentity::new(algorithm))))
    } else if is("VerifyMode") {
        Ok(policy.with_client_auth(verify_mode(value)))
    } else if is("VerifyCAFile") {
        if value.eq_ignore_ascii_case(BUNDLED) {
            return Ok(policy.with_trust(TrustStore::Bundled));
        }
        let anchors = tokens(value, |t| algorithm(t).map(TrustAnchor::demo_root))?;
        Ok(policy.with_trust(TrustStore::Anchors(anchors)))
    } else {
        Ok(policy)
    }
}

fn tokens<T>(
    value: &str,
    lookup: impl Fn(&str) -> Result<T, ConfigError>,
) -> Result<Vec<T>, ConfigError> {
    value.split(':').map(str::trim).filter(|t| !t.is_empty()).map(lookup).collect()
}

fn algorithm(name: &str) -> Result<SignatureAlgorithm, ConfigError> {
    SignatureAlgorithm::from_name(name)
        .ok_or_else(|| ConfigError::UnknownSignatureAlgorithm(name.to_string()))
}

fn verify_mode(value: &str) -> ClientAuth {
    let has = |flag: &str| {
        value.split([',', '|', ' ']).any(|word| word.trim().eq_ignore_ascii_case(flag))
    };

    // FAIL_IF_NO_PEER_CERT is meaningless without PEER
    match (has("Peer"), has("Request")) {
        (true, true) => ClientAuth::Require,
        (true, false) => ClientAuth::Request,
        (false, _) => ClientAuth::Off,
    }
}

/// Render a policy as text. `parse(&render(p)?)` reproduces `p` exactly.
///
/// Fails for identities with a custom chain and for trust anchors other than
/// the bundled demo roots, which the format cannot name.
pub fn render(policy: &EndpointPolicy) -> Result<String, ConfigError> {
    let identity = match policy.identity() {
        None => NO_IDENTITY,
        Some(identity) if identity.is_standard() => identity.algorithm().name(),
        Some(_) => return Err(ConfigError::Unrepresentable("identity with a custom chain")),
    };

    let trust = match policy.trust() {
        TrustStore::Bundled => BUNDLED.to_string(),
        TrustStore::Anchors(anchors) => {
            if !anchors.iter().all(TrustAnchor::is_demo_root) {
                return Err(ConfigError::Unrepresentable("custom trust anchor"));
            }
            join(anchors.iter().map(|anchor| anchor.algorithm.name()))
        },
    };

    let verify = match policy.client_auth() {
        ClientAuth::Off => "None",
        ClientAuth::Request => "Peer",
        ClientAuth::Require => "Peer,Request",
    };

    let mut out = String::new();
    // writing to a String cannot fail
    let _ = writeln!(out, "[{SECTION}]");
    let _ = writeln!(out, "MinProtocol = {TLS13}");
    let _ = writeln!(out, "MaxProtocol = {TLS13}");
    let _ = writeln!(
        out,
        "Ciphersuites = {}",
        join(policy.cipher_suites().iter().map(|s| s.iana_name()))
    );
    let _ = writeln!(out, "Groups = {}", join(policy.groups().iter().map(|g| g.name())));
    let _ = writeln!(
        out,
        "SignatureAlgorithms = {}",
        join(policy.signature_schemes().iter().map(|s| s.name()))
    );
    let _ = writeln!(out, "Identity = {identity}");
    let _ = writeln!(out, "VerifyMode = {verify}");
    let _ = writeln!(out, "VerifyCAFile = {trust}");

    Ok(out)
}

fn join<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        identity::{Certificate, CertificateChain, PrivateKeyHandle},
        signature::{MlDsaLevel, RsaKeySize},
    };

    #[test]
    fn parse_colon_separated_keys() {
        let text = "Ciphersuites: TLS_AES_256_GCM_SHA384:TLS_CHACHA20_POLY1305_SHA256\n\
                    Groups: X25519:P-384\n";
        let policy = parse(text).unwrap();

        assert_eq!(
            policy.cipher_suites(),
            [CipherSuite::Aes256GcmSha384, CipherSuite::Chacha20Poly1305Sha256]
        );
        assert_eq!(policy.groups(), [KeyExchangeGroup::X25519, KeyExchangeGroup::P384]);
    }

    #[test]
    fn parse_openssl_style_file() {
        let text = "\
openssl_conf = openssl_init

[openssl_init]
ssl_conf = ssl_sect

[system_default_sect]
MinProtocol = TLSv1.3
Ciphersuites = TLS_AES_128_GCM_SHA256
Groups = secp384r1
VerifyMode = Peer,Request
VerifyCAFile = ML-DSA-44
";
        let policy = parse(text).unwrap();

        assert_eq!(policy.cipher_suites(), [CipherSuite::Aes128GcmSha256]);
        assert_eq!(policy.groups(), [KeyExchangeGroup::P384]);
        assert!(policy.require_client_certificate());
        assert_eq!(
            policy.trust(),
            &TrustStore::Anchors(vec![TrustAnchor::demo_root(SignatureAlgorithm::MlDsa(
                MlDsaLevel::MlDsa44
            ))])
        );
    }

    #[test]
    fn parse_onto_keeps_base_identity() {
        let server = parse_onto(EndpointPolicy::default_server(), "Groups = P-256\n").unwrap();
        assert_eq!(
            server.identity().map(SignatureIdentity::algorithm),
            Some(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048))
        );
        assert_eq!(server.groups(), [KeyExchangeGroup::P256]);

        let anonymous = parse_onto(EndpointPolicy::default_server(), "Identity = none\n").unwrap();
        assert_eq!(anonymous.identity(), None);
    }

    #[test]
    fn missing_key_keeps_default_empty_value_clears() {
        let policy = parse("Groups =\n").unwrap();
        assert!(policy.groups().is_empty());
        assert_eq!(policy.cipher_suites(), CipherSuite::ALL);
    }

    #[test]
    fn verify_mode_words() {
        assert_eq!(verify_mode("None"), ClientAuth::Off);
        assert_eq!(verify_mode("Peer"), ClientAuth::Request);
        assert_eq!(verify_mode("Peer,Request"), ClientAuth::Require);
        assert_eq!(verify_mode("Request"), ClientAuth::Off);
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert_eq!(
            parse("Ciphersuites = TLS_AES_512_GCM"),
            Err(ConfigError::UnknownCipherSuite("TLS_AES_512_GCM".into()))
        );
        assert_eq!(parse("Groups = X448"), Err(ConfigError::UnknownGroup("X448".into())));
        assert!(matches!(
            parse("MinProtocol = TLSv1.2"),
            Err(ConfigError::UnsupportedProtocol { .. })
        ));
        assert!(matches!(parse("garbage line"), Err(ConfigError::MalformedLine { line: 1, .. })));
    }

    #[test]
    fn render_rejects_custom_chain() {
        let alg = SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048);
        let chain = CertificateChain::new(vec![Certificate {
            subject: "leaf".into(),
            issuer: "Corp CA".into(),
            key_algorithm: alg,
            signed_with: alg,
        }]);
        let policy = EndpointPolicy::default().with_identity(Some(SignatureIdentity::with_chain(
            alg,
            chain,
            PrivateKeyHandle::new("k"),
        )));

        assert!(matches!(render(&policy), Err(ConfigError::Unrepresentable(_))));
    }

    #[test]
    fn render_default_policy() {
        insta::assert_snapshot!(render(&EndpointPolicy::default()).unwrap(), @r"
        [system_default_sect]
        MinProtocol = TLSv1.3
        MaxProtocol = TLSv1.3
        Ciphersuites = TLS_AES_256_GCM_SHA384:TLS_AES_128_GCM_SHA256:TLS_CHACHA20_POLY1305_SHA256
        Groups = X25519:P-256:P-384
        SignatureAlgorithms = mldsa44:mldsa65:mldsa87:ecdsa_secp256r1_sha256:ecdsa_secp384r1_sha384:rsa_pss_rsae_sha256:rsa_pss_rsae_sha384:rsa_pss_rsae_sha512
        Identity = none
        VerifyMode = None
        VerifyCAFile = bundled
        ");
    }
}
