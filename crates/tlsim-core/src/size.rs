//! Handshake message sizes.
//!
//! Lengths follow the RFC 8446 encodings: a 4-byte handshake header, then the
//! body with its vector length prefixes. Key shares, certificates and
//! signatures use the real sizes of the negotiated algorithms, so PQC
//! configurations produce visibly larger flights.

use tlsim_proto::{
    EndpointPolicy, HashAlgorithm, KeyExchangeGroup, SignatureIdentity, SignatureScheme,
};

/// `msg_type` (1) + `length` (3).
pub const HANDSHAKE_HEADER_LEN: usize = 4;

/// `legacy_version` (2) + `random` (32).
const HELLO_PREFIX_LEN: usize = 2 + 32;

/// `legacy_session_id` of 32 bytes with its length byte.
const SESSION_ID_LEN: usize = 1 + 32;

/// Extension type (2) + extension length (2).
const EXTENSION_HEADER_LEN: usize = 4;

/// `supported_versions` extension carrying TLS 1.3 only.
const CLIENT_VERSIONS_EXT_LEN: usize = EXTENSION_HEADER_LEN + 1 + 2;
const SERVER_VERSIONS_EXT_LEN: usize = EXTENSION_HEADER_LEN + 2;

/// Byte sizes of handshake messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeModel;

impl SizeModel {
    /// `ClientHello` built from the client policy, carrying one key share
    /// for `share`. No share is sent when `share` is `None`.
    pub fn client_hello(policy: &EndpointPolicy, share: Option<KeyExchangeGroup>) -> usize {
        let suites = 2 + 2 * policy.cipher_suites().len();
        let compression = 1 + 1;
        let groups = EXTENSION_HEADER_LEN + 2 + 2 * policy.groups().len();
        let schemes = EXTENSION_HEADER_LEN + 2 + 2 * policy.signature_schemes().len();
        let key_share =
            EXTENSION_HEADER_LEN + 2 + share.map_or(0, |g| 2 + 2 + g.client_share_len());
        let extensions = CLIENT_VERSIONS_EXT_LEN + groups + schemes + key_share;

        HANDSHAKE_HEADER_LEN
            + HELLO_PREFIX_LEN
            + SESSION_ID_LEN
            + suites
            + compression
            + 2
            + extensions
    }

    /// `ServerHello` answering with a `group` share.
    pub fn server_hello(group: KeyExchangeGroup) -> usize {
        let fixed = HELLO_PREFIX_LEN + SESSION_ID_LEN + 2 + 1;
        let key_share = EXTENSION_HEADER_LEN + 2 + 2 + group.server_share_len();
        HANDSHAKE_HEADER_LEN + fixed + 2 + SERVER_VERSIONS_EXT_LEN + key_share
    }

    /// `EncryptedExtensions` with no extensions.
    pub fn encrypted_extensions() -> usize {
        HANDSHAKE_HEADER_LEN + 2
    }

    /// `CertificateRequest` advertising `schemes`.
    pub fn certificate_request(schemes: &[SignatureScheme]) -> usize {
        let context = 1;
        let signature_algorithms = EXTENSION_HEADER_LEN + 2 + 2 * schemes.len();
        HANDSHAKE_HEADER_LEN + context + 2 + signature_algorithms
    }

    /// `Certificate` carrying the chain of `identity`, or an empty list.
    pub fn certificate(identity: Option<&SignatureIdentity>) -> usize {
        let context = 1;
        let list = identity.map_or(0, |id| id.chain().encoded_len());
        HANDSHAKE_HEADER_LEN + context + 3 + list
    }

    /// `CertificateVerify` signed with the identity's algorithm.
    pub fn certificate_verify(identity: &SignatureIdentity) -> usize {
        HANDSHAKE_HEADER_LEN + 2 + 2 + identity.algorithm().signature_len()
    }

    /// `Finished` for the negotiated transcript hash.
    pub fn finished(hash: HashAlgorithm) -> usize {
        HANDSHAKE_HEADER_LEN + hash.output_len()
    }

    /// Server authentication flight: `EncryptedExtensions`, an optional
    /// `CertificateRequest`, `Certificate` and `CertificateVerify`.
    pub fn server_auth_flight(
        identity: &SignatureIdentity,
        certificate_request: Option<&[SignatureScheme]>,
    ) -> usize {
        Self::encrypted_extensions()
            + certificate_request.map_or(0, Self::certificate_request)
            + Self::certificate(Some(identity))
            + Self::certificate_verify(identity)
    }

    /// Client authentication flight: `Certificate` and `CertificateVerify`.
    pub fn client_auth_flight(identity: &SignatureIdentity) -> usize {
        Self::certificate(Some(identity)) + Self::certificate_verify(identity)
    }

    /// Client `Finished` flight. A client asked for a certificate that it
    /// does not have sends an empty `Certificate` first.
    pub fn client_finished_flight(hash: HashAlgorithm, empty_certificate: bool) -> usize {
        let empty = if empty_certificate { Self::certificate(None) } else { 0 };
        empty + Self::finished(hash)
    }
}

#[cfg(test)]
mod tests {
    use tlsim_proto::{MlDsaLevel, RsaKeySize, SignatureAlgorithm};

    use super::*;

    #[test]
    fn mlkem_hello_is_larger() {
        let classic = EndpointPolicy::default().with_groups([KeyExchangeGroup::X25519]);
        let pqc = classic.with_groups([KeyExchangeGroup::MlKem768]);

        let delta = SizeModel::client_hello(&pqc, Some(KeyExchangeGroup::MlKem768))
            - SizeModel::client_hello(&classic, Some(KeyExchangeGroup::X25519));
        assert_eq!(delta, 1184 - 32);
        assert_eq!(
            SizeModel::server_hello(KeyExchangeGroup::MlKem768)
                - SizeModel::server_hello(KeyExchangeGroup::X25519),
            1088 - 32
        );
    }

    #[test]
    fn mldsa_flight_is_larger() {
        let rsa = SignatureIdentity::new(SignatureAlgorithm::Rsa(RsaKeySize::Rsa2048));
        let mldsa = SignatureIdentity::new(SignatureAlgorithm::MlDsa(MlDsaLevel::MlDsa44));

        assert!(
            SizeModel::server_auth_flight(&mldsa, None) > SizeModel::server_auth_flight(&rsa, None)
        );
        assert_eq!(SizeModel::certificate_verify(&rsa), 4 + 4 + 256);
    }

    #[test]
    fn finished_tracks_hash() {
        assert_eq!(SizeModel::finished(HashAlgorithm::Sha256), 36);
        assert_eq!(SizeModel::finished(HashAlgorithm::Sha384), 52);
        assert_eq!(SizeModel::client_finished_flight(HashAlgorithm::Sha256, true), 8 + 36);
    }

    #[test]
    fn missing_share_is_smaller() {
        let policy = EndpointPolicy::default().with_groups([KeyExchangeGroup::X25519]);
        assert_eq!(
            SizeModel::client_hello(&policy, Some(KeyExchangeGroup::X25519))
                - SizeModel::client_hello(&policy, None),
            2 + 2 + 32
        );
    }

    #[test]
    fn share_follows_the_given_group() {
        let policy = EndpointPolicy::default()
            .with_groups([KeyExchangeGroup::MlKem768, KeyExchangeGroup::X25519]);
        assert_eq!(
            SizeModel::client_hello(&policy, Some(KeyExchangeGroup::MlKem768))
                - SizeModel::client_hello(&policy, Some(KeyExchangeGroup::X25519)),
            1184 - 32
        );
    }
}
