//! TLS 1.3 key schedule (RFC 8446 §7.1).
//!
//! ```text
//!              0
//!              │
//!    0 ──> HKDF-Extract = Early Secret
//!              │
//!        Derive-Secret(., "derived", "")
//!              │
//! (EC)DHE ──> HKDF-Extract = Handshake Secret ──> c/s hs traffic
//!              │
//!        Derive-Secret(., "derived", "")
//!              │
//!    0 ──> HKDF-Extract = Master Secret ──> c/s ap traffic
//! ```
//!
//! No PSK is ever used, so the early secret is always the all-zero extract.

use std::fmt;

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};
use tlsim_proto::{CipherSuite, HashAlgorithm};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Prefix prepended to every `HkdfLabel.label`.
const LABEL_PREFIX: &[u8] = b"tls13 ";

/// Per-record nonce length for every TLS 1.3 AEAD.
pub const IV_LEN: usize = 12;

/// HKDF-Extract.
pub fn extract(hash: HashAlgorithm, salt: &[u8], ikm: &[u8]) -> Zeroizing<Vec<u8>> {
    let prk = match hash {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec(),
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::extract(Some(salt), ikm).0.to_vec(),
    };
    Zeroizing::new(prk)
}

/// HKDF-Expand to `len` bytes.
pub fn expand(
    hash: HashAlgorithm,
    prk: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let max = 255 * hash.output_len();
    if len > max {
        return Err(CryptoError::OutputTooLong { requested: len, max });
    }

    let mut okm = Zeroizing::new(vec![0u8; len]);
    let expanded = match hash {
        HashAlgorithm::Sha256 => {
            Hkdf::<Sha256>::from_prk(prk).map(|hk| hk.expand(info, okm.as_mut_slice()))
        },
        HashAlgorithm::Sha384 => {
            Hkdf::<Sha384>::from_prk(prk).map(|hk| hk.expand(info, okm.as_mut_slice()))
        },
    };

    match expanded {
        Ok(Ok(())) => Ok(okm),
        Ok(Err(_)) => Err(CryptoError::OutputTooLong { requested: len, max }),
        Err(_) => Err(CryptoError::InvalidPrk(prk.len())),
    }
}

/// HKDF-Expand-Label.
pub fn expand_label(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    context: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let full_label_len = LABEL_PREFIX.len() + label.len();

    // struct { uint16 length; opaque label<7..255>; opaque context<0..255>; }
    let mut info = Vec::with_capacity(4 + full_label_len + context.len());
    info.extend_from_slice(&(len as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label.as_bytes());
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    expand(hash, secret, &info, len)
}

/// Derive-Secret: `expand_label(secret, label, transcript_hash, Hash.length)`.
pub fn derive_secret(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    transcript_hash: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    expand_label(hash, secret, label, transcript_hash, hash.output_len())
}

/// Transcript-Hash over concatenated handshake messages.
pub fn transcript_hash(hash: HashAlgorithm, transcript: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha256 => Sha256::digest(transcript).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(transcript).to_vec(),
    }
}

/// Early secret without a PSK: `HKDF-Extract(0, 0)`.
pub fn early_secret(hash: HashAlgorithm) -> Zeroizing<Vec<u8>> {
    let zeros = vec![0u8; hash.output_len()];
    extract(hash, &zeros, &zeros)
}

/// A client or server traffic secret.
pub struct TrafficSecret {
    hash: HashAlgorithm,
    secret: Zeroizing<Vec<u8>>,
}

impl TrafficSecret {
    fn new(hash: HashAlgorithm, secret: Zeroizing<Vec<u8>>) -> Self {
        Self { hash, secret }
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.secret
    }

    /// Record protection key and IV for `suite`.
    pub fn traffic_keys(&self, suite: CipherSuite) -> Result<TrafficKeys, CryptoError> {
        let key = expand_label(self.hash, &self.secret, "key", &[], suite.key_len())?;
        let iv_bytes = expand_label(self.hash, &self.secret, "iv", &[], IV_LEN)?;

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&iv_bytes);
        Ok(TrafficKeys { key, iv })
    }

    /// Finished `verify_data`: `HMAC(finished_key, transcript_hash)`.
    pub fn finished_verify_data(&self, transcript_hash: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let finished_key =
            expand_label(self.hash, &self.secret, "finished", &[], self.hash.output_len())?;
        let invalid = |_| CryptoError::InvalidKeyLength { cipher: "HMAC" };

        let tag = match self.hash {
            HashAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(&finished_key).map_err(invalid)?;
                mac.update(transcript_hash);
                mac.finalize().into_bytes().to_vec()
            },
            HashAlgorithm::Sha384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(&finished_key).map_err(invalid)?;
                mac.update(transcript_hash);
                mac.finalize().into_bytes().to_vec()
            },
        };
        Ok(tag)
    }
}

impl fmt::Debug for TrafficSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficSecret").field("hash", &self.hash).finish_non_exhaustive()
    }
}

/// AEAD key and static IV for one direction.
pub struct TrafficKeys {
    key: Zeroizing<Vec<u8>>,
    iv: [u8; IV_LEN],
}

impl TrafficKeys {
    /// AEAD key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Static IV.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Per-record nonce: the IV XORed with the left-padded sequence number.
    pub fn nonce(&self, sequence: u64) -> [u8; IV_LEN] {
        let mut nonce = self.iv;
        for (byte, seq) in nonce[IV_LEN - 8..].iter_mut().zip(sequence.to_be_bytes()) {
            *byte ^= seq;
        }
        nonce
    }
}

impl fmt::Debug for TrafficKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficKeys").field("key_len", &self.key.len()).finish_non_exhaustive()
    }
}

/// Handshake traffic secrets plus the handshake secret they came from.
#[derive(Debug)]
pub struct HandshakeSecrets {
    hash: HashAlgorithm,
    handshake_secret: TrafficSecret,
    /// `client_handshake_traffic_secret`
    pub client: TrafficSecret,
    /// `server_handshake_traffic_secret`
    pub server: TrafficSecret,
}

impl HandshakeSecrets {
    /// Run the schedule up to the handshake traffic secrets.
    ///
    /// `transcript_hash` covers ClientHello..ServerHello.
    pub fn derive(
        hash: HashAlgorithm,
        shared_secret: &[u8],
        transcript_hash: &[u8],
    ) -> Result<Self, CryptoError> {
        let empty = self::transcript_hash(hash, &[]);
        let derived = derive_secret(hash, &early_secret(hash), "derived", &empty)?;
        let handshake_secret = extract(hash, &derived, shared_secret);

        let client = derive_secret(hash, &handshake_secret, "c hs traffic", transcript_hash)?;
        let server = derive_secret(hash, &handshake_secret, "s hs traffic", transcript_hash)?;

        Ok(Self {
            hash,
            handshake_secret: TrafficSecret::new(hash, handshake_secret),
            client: TrafficSecret::new(hash, client),
            server: TrafficSecret::new(hash, server),
        })
    }

    /// Continue to the application traffic secrets.
    ///
    /// `transcript_hash` covers ClientHello..server Finished.
    pub fn application(&self, transcript_hash: &[u8]) -> Result<ApplicationSecrets, CryptoError> {
        let hash = self.hash;
        let empty = self::transcript_hash(hash, &[]);
        let derived = derive_secret(hash, self.handshake_secret.as_bytes(), "derived", &empty)?;
        let master = extract(hash, &derived, &vec![0u8; hash.output_len()]);

        let client = derive_secret(hash, &master, "c ap traffic", transcript_hash)?;
        let server = derive_secret(hash, &master, "s ap traffic", transcript_hash)?;

        Ok(ApplicationSecrets {
            client: TrafficSecret::new(hash, client),
            server: TrafficSecret::new(hash, server),
        })
    }
}

/// Application traffic secrets.
#[derive(Debug)]
pub struct ApplicationSecrets {
    /// `client_application_traffic_secret_0`
    pub client: TrafficSecret,
    /// `server_application_traffic_secret_0`
    pub server: TrafficSecret,
}
