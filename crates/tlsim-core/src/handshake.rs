//! Handshake state machine.
//!
//! Sans-IO and externally stepped: each [`Handshake::advance`] performs one
//! transition, draws any key material it needs from the [`KeySource`], and
//! writes crypto entries, events and packets to the session journal.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ client_hello ┌───────────────────┐ server_hello ┌───────────────────┐
//! │ INIT │─────────────>│ CLIENT_HELLO_SENT │─────────────>│ SERVER_HELLO_SENT │
//! └──────┘              └───────────────────┘              └───────────────────┘
//!                                 │ no common suite/group            │ key_exchange
//!                                 ↓                                  ↓
//!                            ┌────────┐  certificate fail  ┌───────────────────┐
//!                            │ FAILED │<───────────────────│ KEY_EXCHANGE_DONE │
//!                            └────────┘                    └───────────────────┘
//!                                                                    │ certificate_verify
//!                                                                    ↓
//!                                                         ┌──────────────────────┐
//!                                                         │ CERTIFICATE_EXCHANGE │
//!                                                         └──────────────────────┘
//!                                                                    │ finished x2
//!                                                                    ↓
//!                                                         ┌──────────────────────┐
//!                                                         │ FINISHED_ESTABLISHED │
//!                                                         └──────────────────────┘
//! ```
//!
//! Every terminal transition appends exactly one `negotiation_result`.

use std::fmt;

use serde::Serialize;
use tlsim_crypto::{
    Encapsulation, HandshakeSecrets, KeyPair, SEED_LEN, SigningKey, kdf, sign, signed_content,
};
use tlsim_proto::{
    CipherSuite, ClientAuth, EndpointPolicy, HashAlgorithm, KexMechanism, KeyExchangeGroup,
    SignatureIdentity, SignatureScheme,
};

use crate::{
    env::{KeyPurpose, KeySource},
    error::SessionError,
    event::{EventKind, Side},
    journal::Journal,
    negotiation::{
        Established, FailureReason, NegotiationResult, select_cipher_suite, select_group,
        select_signature_scheme,
    },
    size::SizeModel,
    trace::{CryptoOp, preview},
    transport::Transport,
    validator::validate_chain,
};

/// Negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandshakeState {
    /// Nothing sent yet
    Init,
    /// `client_hello` emitted
    ClientHelloSent,
    /// Suite and group chosen, `server_hello` emitted
    ServerHelloSent,
    /// Shared secret and handshake traffic secrets derived
    KeyExchangeDone,
    /// Certificates presented and verified
    CertificateExchange,
    /// Both `finished` emitted; transport enabled
    Established,
    /// Negotiation aborted
    Failed,
}

impl HandshakeState {
    /// Upper-case label used in the crypto trace.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::ClientHelloSent => "CLIENT_HELLO_SENT",
            Self::ServerHelloSent => "SERVER_HELLO_SENT",
            Self::KeyExchangeDone => "KEY_EXCHANGE_DONE",
            Self::CertificateExchange => "CERTIFICATE_EXCHANGE",
            Self::Established => "FINISHED_ESTABLISHED",
            Self::Failed => "FAILED",
        }
    }

    /// `Established` and `Failed` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Established | Self::Failed)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs borrowed from the session for one transition.
pub(crate) struct Context<'a, K> {
    pub(crate) client: &'a EndpointPolicy,
    pub(crate) server: &'a EndpointPolicy,
    pub(crate) keys: &'a mut K,
    pub(crate) journal: &'a mut Journal,
}

/// What a transition produced.
pub(crate) enum Step {
    /// Non-terminal state reached
    Continue,
    /// Handshake finished; the record layer is ready
    Established(NegotiationResult, Transport),
    /// Handshake aborted
    Failed(NegotiationResult),
}

/// Handshake progress of one session.
#[derive(Debug)]
pub(crate) struct Handshake {
    state: HandshakeState,
    transcript: Vec<u8>,
    suite: Option<CipherSuite>,
    group: Option<KeyExchangeGroup>,
    secrets: Option<HandshakeSecrets>,
    server_auth: Option<(SignatureIdentity, SignatureScheme)>,
    client_auth: Option<(SignatureIdentity, SignatureScheme)>,
    anonymous_client: bool,
}

impl Handshake {
    pub(crate) fn new() -> Self {
        Self {
            state: HandshakeState::Init,
            transcript: Vec::new(),
            suite: None,
            group: None,
            secrets: None,
            server_auth: None,
            client_auth: None,
            anonymous_client: false,
        }
    }

    pub(crate) fn state(&self) -> HandshakeState {
        self.state
    }

    /// Perform exactly one transition.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` from a terminal state
    /// - `SessionError::Crypto` if a primitive rejects its inputs
    pub(crate) fn advance<K: KeySource>(
        &mut self,
        ctx: Context<'_, K>,
    ) -> Result<Step, SessionError> {
        let from = self.state;
        let step = match from {
            HandshakeState::Init => self.client_hello(ctx),
            HandshakeState::ClientHelloSent => self.server_hello(ctx),
            HandshakeState::ServerHelloSent => self.key_exchange(ctx)?,
            HandshakeState::KeyExchangeDone => self.certificate_exchange(ctx)?,
            HandshakeState::CertificateExchange => self.finish(ctx)?,
            HandshakeState::Established | HandshakeState::Failed => {
                return Err(SessionError::InvalidState {
                    state: from,
                    operation: "advance".to_string(),
                });
            },
        };
        tracing::debug!(from = from.label(), to = self.state.label(), "handshake transition");
        Ok(step)
    }

    fn absorb(&mut self, kind: EventKind, bytes: &[u8]) {
        self.transcript.extend_from_slice(kind.as_str().as_bytes());
        self.transcript.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.transcript.extend_from_slice(bytes);
    }

    fn transcript_hash(&self, hash: HashAlgorithm) -> Vec<u8> {
        kdf::transcript_hash(hash, &self.transcript)
    }

    fn negotiated(&self) -> Result<(CipherSuite, KeyExchangeGroup), SessionError> {
        match (self.suite, self.group) {
            (Some(suite), Some(group)) => Ok((suite, group)),
            _ => Err(SessionError::InvalidState {
                state: self.state,
                operation: "continue without negotiated parameters".to_string(),
            }),
        }
    }

    fn fail(
        &mut self,
        journal: &mut Journal,
        reason: FailureReason,
        detail: Option<String>,
    ) -> Step {
        let result = NegotiationResult::Failed { reason, detail };
        tracing::info!(state = self.state.label(), %reason, "negotiation failed");

        journal.emit(EventKind::NegotiationResult, Side::Connection, result.to_string(), None);
        self.state = HandshakeState::Failed;
        Step::Failed(result)
    }

    fn client_hello<K: KeySource>(&mut self, ctx: Context<'_, K>) -> Step {
        let client = ctx.client;
        let mut random = [0u8; 32];
        ctx.keys.fill(Side::Client, KeyPurpose::HelloRandom, &mut random);

        self.absorb(EventKind::ClientHello, &random);
        for suite in client.cipher_suites() {
            self.transcript.extend_from_slice(&suite.code().to_be_bytes());
        }
        for group in client.groups() {
            self.transcript.extend_from_slice(&group.code().to_be_bytes());
        }
        for scheme in client.signature_schemes() {
            self.transcript.extend_from_slice(&scheme.code().to_be_bytes());
        }

        let summary = format!(
            "suites=[{}] groups=[{}] sigalgs=[{}] random={}",
            join(client.cipher_suites()),
            join(client.groups()),
            join(client.signature_schemes()),
            preview(&random)
        );
        // the share is for the group the server will pick, else the first offered
        let share = select_group(client.groups(), ctx.server.groups())
            .or_else(|| client.groups().first().copied());
        ctx.journal.emit(
            EventKind::ClientHello,
            Side::Client,
            summary,
            Some(SizeModel::client_hello(client, share)),
        );
        self.state = HandshakeState::ClientHelloSent;
        Step::Continue
    }

    fn server_hello<K: KeySource>(&mut self, ctx: Context<'_, K>) -> Step {
        let (client, server) = (ctx.client, ctx.server);
        let suite = select_cipher_suite(client.cipher_suites(), server.cipher_suites());
        let group = select_group(client.groups(), server.groups());
        let missing_certificate =
            server.require_client_certificate() && client.identity().is_none();

        let (suite, group) = match (suite, group) {
            (Some(suite), Some(group)) => (suite, group),
            _ if missing_certificate => {
                let reason = FailureReason::ClientCertificateRequiredButAbsent;
                return self.fail(ctx.journal, reason, None);
            },
            (None, _) => return self.fail(ctx.journal, FailureReason::NoCommonCipherSuite, None),
            (Some(_), None) => return self.fail(ctx.journal, FailureReason::NoCommonGroup, None),
        };

        let mut random = [0u8; 32];
        ctx.keys.fill(Side::Server, KeyPurpose::HelloRandom, &mut random);
        self.absorb(EventKind::ServerHello, &random);
        self.transcript.extend_from_slice(&suite.code().to_be_bytes());
        self.transcript.extend_from_slice(&group.code().to_be_bytes());

        self.suite = Some(suite);
        self.group = Some(group);

        let summary = format!("suite={suite} group={group} random={}", preview(&random));
        ctx.journal.emit(
            EventKind::ServerHello,
            Side::Server,
            summary,
            Some(SizeModel::server_hello(group)),
        );
        self.state = HandshakeState::ServerHelloSent;
        Step::Continue
    }

    fn key_exchange<K: KeySource>(&mut self, ctx: Context<'_, K>) -> Result<Step, SessionError> {
        let (suite, group) = self.negotiated()?;
        let label = self.state.label();
        let journal = ctx.journal;

        let mut seed = [0u8; SEED_LEN];
        ctx.keys.fill(Side::Client, KeyPurpose::Ephemeral, &mut seed);
        let client_pair = KeyPair::generate(group, &seed);
        record_keygen(journal, Side::Client, label, &client_pair);

        let shared = match group.mechanism() {
            KexMechanism::Ecdh => {
                ctx.keys.fill(Side::Server, KeyPurpose::Ephemeral, &mut seed);
                let server_pair = KeyPair::generate(group, &seed);
                record_keygen(journal, Side::Server, label, &server_pair);

                let client_shared = client_pair.agree(server_pair.public())?;
                journal.crypto(
                    Side::Client,
                    label,
                    CryptoOp::Ecdh,
                    format!(
                        "group={group} own={}B peer={}B",
                        client_pair.public().len(),
                        server_pair.public().len()
                    ),
                    format!("shared={}B {}", client_shared.len(), preview(&client_shared)),
                );

                let server_shared = server_pair.agree(client_pair.public())?;
                journal.crypto(
                    Side::Server,
                    label,
                    CryptoOp::Ecdh,
                    format!(
                        "group={group} own={}B peer={}B",
                        server_pair.public().len(),
                        client_pair.public().len()
                    ),
                    format!("shared={}B {}", server_shared.len(), preview(&server_shared)),
                );
                debug_assert!(client_shared == server_shared, "ECDH views must agree");

                self.absorb(EventKind::KeyExchange, client_pair.public());
                self.absorb(EventKind::KeyExchange, server_pair.public());
                client_shared
            },
            KexMechanism::Kem => {
                let mut coins = [0u8; SEED_LEN];
                ctx.keys.fill(Side::Server, KeyPurpose::Encapsulation, &mut coins);
                let encapsulation =
                    Encapsulation::encapsulate(group, client_pair.public(), &coins)?;
                journal.crypto(
                    Side::Server,
                    label,
                    CryptoOp::KemEncapsulate,
                    format!("group={group} ek={}B coins={}B", client_pair.public().len(), SEED_LEN),
                    format!(
                        "ciphertext={}B shared={}B {}",
                        encapsulation.ciphertext.len(),
                        encapsulation.shared_secret.len(),
                        preview(&encapsulation.shared_secret)
                    ),
                );

                let client_shared = client_pair.decapsulate(&encapsulation.ciphertext)?;
                journal.crypto(
                    Side::Client,
                    label,
                    CryptoOp::KemDecapsulate,
                    format!("group={group} ciphertext={}B", encapsulation.ciphertext.len()),
                    format!("shared={}B {}", client_shared.len(), preview(&client_shared)),
                );

                self.absorb(EventKind::KeyExchange, client_pair.public());
                self.absorb(EventKind::KeyExchange, &encapsulation.ciphertext);
                client_shared
            },
        };

        let hash = suite.hash();
        let transcript_hash = self.transcript_hash(hash);
        let secrets = HandshakeSecrets::derive(hash, &shared, &transcript_hash)?;
        journal.crypto(
            Side::Connection,
            label,
            CryptoOp::Kdf,
            format!("shared={}B transcript={}", shared.len(), preview(&transcript_hash)),
            format!(
                "c_hs_traffic={} s_hs_traffic={}",
                preview(secrets.client.as_bytes()),
                preview(secrets.server.as_bytes())
            ),
        );
        self.secrets = Some(secrets);

        let summary = format!(
            "group={group} mechanism={} shared_secret={}B {}",
            match group.mechanism() {
                KexMechanism::Ecdh => "ecdh",
                KexMechanism::Kem => "kem",
            },
            shared.len(),
            preview(&shared)
        );
        journal.emit(EventKind::KeyExchange, Side::Connection, summary, None);
        self.state = HandshakeState::KeyExchangeDone;
        Ok(Step::Continue)
    }

    fn certificate_exchange<K: KeySource>(
        &mut self,
        ctx: Context<'_, K>,
    ) -> Result<Step, SessionError> {
        let (suite, _) = self.negotiated()?;
        let hash = suite.hash();
        let (client, server) = (ctx.client, ctx.server);

        let Some(server_identity) = server.identity() else {
            return Ok(self.fail(ctx.journal, FailureReason::ServerCertificateAbsent, None));
        };
        let Some(server_scheme) =
            select_signature_scheme(server_identity.algorithm(), client.signature_schemes())
        else {
            let family = server_identity.algorithm().family();
            let detail = format!("client accepts no {family} scheme");
            let reason = FailureReason::SignatureAlgorithmMismatch;
            return Ok(self.fail(ctx.journal, reason, Some(detail)));
        };

        let request = (server.client_auth() != ClientAuth::Off).then(|| server.signature_schemes());
        self.authenticate(
            ctx.keys,
            ctx.journal,
            Side::Server,
            server_identity,
            server_scheme,
            hash,
        )?;
        ctx.journal.emit(
            EventKind::CertificateVerify,
            Side::Server,
            certificate_summary(server_identity, server_scheme),
            Some(SizeModel::server_auth_flight(server_identity, request)),
        );
        if let Err(err) = validate_chain(server_identity, client.trust()) {
            tracing::debug!(error = %err, "server chain rejected");
            let detail = err.explanation().to_string();
            return Ok(self.fail(ctx.journal, FailureReason::CertificateChainInvalid, Some(detail)));
        }
        self.server_auth = Some((server_identity.clone(), server_scheme));

        match (server.client_auth(), client.identity()) {
            (ClientAuth::Off, _) => {},
            (ClientAuth::Require, None) => {
                return Ok(self.fail(
                    ctx.journal,
                    FailureReason::ClientCertificateRequiredButAbsent,
                    None,
                ));
            },
            (ClientAuth::Request, None) => self.anonymous_client = true,
            (ClientAuth::Request | ClientAuth::Require, Some(client_identity)) => {
                let Some(client_scheme) = select_signature_scheme(
                    client_identity.algorithm(),
                    server.signature_schemes(),
                ) else {
                    let family = client_identity.algorithm().family();
                    let detail = format!("server accepts no {family} scheme");
                    return Ok(self.fail(
                        ctx.journal,
                        FailureReason::SignatureAlgorithmMismatch,
                        Some(detail),
                    ));
                };

                self.authenticate(
                    ctx.keys,
                    ctx.journal,
                    Side::Client,
                    client_identity,
                    client_scheme,
                    hash,
                )?;
                ctx.journal.emit(
                    EventKind::CertificateVerify,
                    Side::Client,
                    certificate_summary(client_identity, client_scheme),
                    Some(SizeModel::client_auth_flight(client_identity)),
                );
                if let Err(err) = validate_chain(client_identity, server.trust()) {
                    tracing::debug!(error = %err, "client chain rejected");
                    let detail = err.explanation().to_string();
                    return Ok(self.fail(
                        ctx.journal,
                        FailureReason::CertificateChainInvalid,
                        Some(detail),
                    ));
                }
                self.client_auth = Some((client_identity.clone(), client_scheme));
            },
        }

        self.state = HandshakeState::CertificateExchange;
        Ok(Step::Continue)
    }

    /// Sign the transcript as `signer` and verify it as the peer.
    fn authenticate<K: KeySource>(
        &mut self,
        keys: &mut K,
        journal: &mut Journal,
        signer: Side,
        identity: &SignatureIdentity,
        scheme: SignatureScheme,
        hash: HashAlgorithm,
    ) -> Result<(), SessionError> {
        let label = self.state.label();
        let algorithm = identity.algorithm();

        for certificate in identity.chain().certificates() {
            self.absorb(EventKind::CertificateVerify, certificate.subject.as_bytes());
        }

        let mut seed = [0u8; SEED_LEN];
        keys.fill(signer, KeyPurpose::Identity, &mut seed);
        let key = SigningKey::generate(algorithm, &seed);

        let context = match signer {
            Side::Client => sign::CLIENT_CONTEXT,
            Side::Server | Side::Connection => sign::SERVER_CONTEXT,
        };
        let content = signed_content(context, &self.transcript_hash(hash));
        let signature = key.sign(&content);
        journal.crypto(
            signer,
            label,
            CryptoOp::Sign,
            format!("scheme={scheme} key={} content={}B", identity.key().label(), content.len()),
            format!("signature={}B {}", signature.len(), preview(&signature)),
        );

        key.verifying_key().verify(&content, &signature)?;
        journal.crypto(
            signer.peer(),
            label,
            CryptoOp::Verify,
            format!(
                "scheme={scheme} public={}B signature={}B",
                key.public().len(),
                signature.len()
            ),
            "valid".to_string(),
        );

        self.absorb(EventKind::CertificateVerify, &signature);
        Ok(())
    }

    fn finish<K: KeySource>(&mut self, ctx: Context<'_, K>) -> Result<Step, SessionError> {
        let (suite, group) = self.negotiated()?;
        let hash = suite.hash();
        let label = self.state.label();
        let journal = ctx.journal;

        let (Some(secrets), Some((server_identity, server_scheme))) =
            (self.secrets.take(), self.server_auth.take())
        else {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "finish before key exchange and server authentication".to_string(),
            });
        };

        let transcript_hash = self.transcript_hash(hash);
        let server_verify = secrets.server.finished_verify_data(&transcript_hash)?;
        journal.crypto(
            Side::Server,
            label,
            CryptoOp::Kdf,
            format!("s_hs_traffic transcript={}", preview(&transcript_hash)),
            format!("verify_data={}B {}", server_verify.len(), preview(&server_verify)),
        );
        journal.emit(
            EventKind::Finished,
            Side::Server,
            format!("verify_data={}", preview(&server_verify)),
            Some(SizeModel::finished(hash)),
        );
        self.absorb(EventKind::Finished, &server_verify);

        let transcript_hash = self.transcript_hash(hash);
        let application = secrets.application(&transcript_hash)?;
        journal.crypto(
            Side::Connection,
            label,
            CryptoOp::Kdf,
            format!("handshake_secret transcript={}", preview(&transcript_hash)),
            format!(
                "c_ap_traffic={} s_ap_traffic={}",
                preview(application.client.as_bytes()),
                preview(application.server.as_bytes())
            ),
        );

        let client_verify = secrets.client.finished_verify_data(&transcript_hash)?;
        journal.crypto(
            Side::Client,
            label,
            CryptoOp::Kdf,
            format!("c_hs_traffic transcript={}", preview(&transcript_hash)),
            format!("verify_data={}B {}", client_verify.len(), preview(&client_verify)),
        );
        let summary = if self.anonymous_client {
            format!("empty certificate, verify_data={}", preview(&client_verify))
        } else {
            format!("verify_data={}", preview(&client_verify))
        };
        journal.emit(
            EventKind::Finished,
            Side::Client,
            summary,
            Some(SizeModel::client_finished_flight(hash, self.anonymous_client)),
        );
        self.absorb(EventKind::Finished, &client_verify);

        let client_keys = application.client.traffic_keys(suite)?;
        let server_keys = application.server.traffic_keys(suite)?;
        journal.crypto(
            Side::Connection,
            label,
            CryptoOp::Kdf,
            "c_ap_traffic s_ap_traffic".to_string(),
            format!("key={}B iv={}B per direction", client_keys.key().len(), kdf::IV_LEN),
        );

        let (client_identity, client_scheme) = self.client_auth.take().unzip();
        let result = NegotiationResult::Established(Established {
            suite,
            group,
            server_identity,
            server_scheme,
            client_identity,
            client_scheme,
        });
        tracing::info!(%suite, %group, "negotiation established");

        journal.emit(EventKind::NegotiationResult, Side::Connection, result.to_string(), None);
        self.state = HandshakeState::Established;
        Ok(Step::Established(result, Transport::new(suite, client_keys, server_keys)))
    }
}

fn record_keygen(journal: &mut Journal, side: Side, label: &'static str, pair: &KeyPair) {
    journal.crypto(
        side,
        label,
        CryptoOp::Keygen,
        format!("group={} secret={}B", pair.group(), pair.secret_len()),
        format!("public={}B {}", pair.public().len(), preview(pair.public())),
    );
}

fn certificate_summary(identity: &SignatureIdentity, scheme: SignatureScheme) -> String {
    let chain: Vec<&str> =
        identity.chain().certificates().iter().map(|c| c.subject.as_str()).collect();
    let root = identity.chain().top().map_or("-", |c| c.issuer.as_str());
    format!(
        "identity={} scheme={scheme} chain=[{}] root={root} signature={}B",
        identity.algorithm(),
        chain.join(" <- "),
        identity.algorithm().signature_len()
    )
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
