//! Post-handshake record layer.
//!
//! Each direction has its own application traffic keys and sequence number.
//! A message is split into fragments of at most 2^14 bytes; every fragment is
//! sealed as a `TLSInnerPlaintext` (content followed by the real content type)
//! with the record header as AAD. Records stay in flight, oldest first, until
//! the peer receives them.

use std::collections::VecDeque;

use tlsim_crypto::{TrafficKeys, aead};
use tlsim_proto::{
    CipherSuite, RecordHeader, RecordType,
    record::{AEAD_TAG_LEN, MAX_FRAGMENT_LEN},
};

use crate::{
    error::SessionError,
    event::{EventKind, Side},
    handshake::HandshakeState,
    journal::Journal,
    trace::{CryptoOp, preview},
    wire::WirePacket,
};

/// `close_notify` alert body: level warning (1), description close_notify (0).
const CLOSE_NOTIFY_ALERT: [u8; 2] = [1, 0];

const STATE_LABEL: &str = HandshakeState::Established.label();

/// A message handed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Endpoint that sent it
    pub from: Side,
    /// Endpoint that received it
    pub to: Side,
    /// Decrypted application data
    pub plaintext: Vec<u8>,
}

#[derive(Debug)]
struct SealedRecord {
    sequence: u64,
    header: [u8; RecordHeader::SIZE],
    body: Vec<u8>,
}

#[derive(Debug)]
struct InFlight {
    from: Side,
    records: Vec<SealedRecord>,
}

#[derive(Debug)]
struct Direction {
    keys: TrafficKeys,
    sequence: u64,
}

/// Record layer of an established session.
#[derive(Debug)]
pub(crate) struct Transport {
    suite: CipherSuite,
    client: Direction,
    server: Direction,
    in_flight: VecDeque<InFlight>,
    closed: bool,
}

impl Transport {
    pub(crate) fn new(suite: CipherSuite, client: TrafficKeys, server: TrafficKeys) -> Self {
        Self {
            suite,
            client: Direction { keys: client, sequence: 0 },
            server: Direction { keys: server, sequence: 0 },
            in_flight: VecDeque::new(),
            closed: false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn direction(&mut self, from: Side) -> &mut Direction {
        match from {
            Side::Server => &mut self.server,
            Side::Client | Side::Connection => &mut self.client,
        }
    }

    fn check_open(&self, operation: &str) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::InvalidState {
                state: HandshakeState::Established,
                operation: format!("{operation} after close_notify"),
            });
        }
        Ok(())
    }

    fn check_endpoint(side: Side, operation: &'static str) -> Result<(), SessionError> {
        if side.is_endpoint() {
            Ok(())
        } else {
            Err(SessionError::InvalidSide { side, operation })
        }
    }

    fn seal(
        &mut self,
        from: Side,
        content_type: RecordType,
        data: &[u8],
    ) -> Result<Vec<SealedRecord>, SessionError> {
        let suite = self.suite;
        let direction = self.direction(from);

        let fragments: Vec<&[u8]> =
            if data.is_empty() { vec![data] } else { data.chunks(MAX_FRAGMENT_LEN).collect() };

        let mut records = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let mut inner = Vec::with_capacity(fragment.len() + 1);
            inner.extend_from_slice(fragment);
            inner.push(content_type.to_u8());

            let length = (inner.len() + AEAD_TAG_LEN) as u16;
            let header = RecordHeader::new(RecordType::ApplicationData, length).to_bytes();
            let sequence = direction.sequence;
            let body = aead::seal(suite, &direction.keys, sequence, &header, &inner)?;

            direction.sequence += 1;
            records.push(SealedRecord { sequence, header, body });
        }
        Ok(records)
    }

    pub(crate) fn send(
        &mut self,
        journal: &mut Journal,
        from: Side,
        plaintext: &[u8],
    ) -> Result<WirePacket, SessionError> {
        self.check_open("send")?;
        Self::check_endpoint(from, "send")?;

        let records = self.seal(from, RecordType::ApplicationData, plaintext)?;
        journal.crypto(
            from,
            STATE_LABEL,
            CryptoOp::AeadEncrypt,
            format!(
                "suite={} plaintext={}B seq={}",
                self.suite,
                plaintext.len(),
                records.first().map_or(0, |r| r.sequence)
            ),
            format!(
                "ciphertext={}B records={} {}",
                records.iter().map(|r| r.body.len()).sum::<usize>(),
                records.len(),
                records.first().map(|r| preview(&r.body)).unwrap_or_default()
            ),
        );
        self.in_flight.push_back(InFlight { from, records });

        let summary = String::from_utf8_lossy(plaintext).into_owned();
        let Some(packet) =
            journal.emit(EventKind::MessageSent, from, summary, Some(plaintext.len()))
        else {
            unreachable!("message_sent always carries a payload");
        };
        Ok(packet)
    }

    pub(crate) fn receive(&mut self, journal: &mut Journal) -> Result<Delivery, SessionError> {
        self.check_open("receive")?;
        let Some(message) = self.in_flight.pop_front() else {
            return Err(SessionError::NothingInFlight);
        };

        let suite = self.suite;
        let from = message.from;
        let to = from.peer();
        let direction = self.direction(from);

        let mut plaintext = Vec::new();
        for record in &message.records {
            let mut inner =
                aead::open(suite, &direction.keys, record.sequence, &record.header, &record.body)?;
            inner.pop();
            plaintext.extend_from_slice(&inner);
        }

        journal.crypto(
            to,
            STATE_LABEL,
            CryptoOp::AeadDecrypt,
            format!(
                "ciphertext={}B records={}",
                message.records.iter().map(|r| r.body.len()).sum::<usize>(),
                message.records.len()
            ),
            format!("plaintext={}B", plaintext.len()),
        );

        let summary = format!("Received: {}", String::from_utf8_lossy(&plaintext));
        journal.emit(EventKind::MessageReceived, to, summary, Some(plaintext.len()));
        Ok(Delivery { from, to, plaintext })
    }

    pub(crate) fn close(&mut self, journal: &mut Journal, from: Side) -> Result<(), SessionError> {
        self.check_open("close")?;
        Self::check_endpoint(from, "close")?;

        let records = self.seal(from, RecordType::Alert, &CLOSE_NOTIFY_ALERT)?;
        journal.crypto(
            from,
            STATE_LABEL,
            CryptoOp::AeadEncrypt,
            format!("alert=close_notify seq={}", records.first().map_or(0, |r| r.sequence)),
            format!("ciphertext={}B", records.iter().map(|r| r.body.len()).sum::<usize>()),
        );

        self.closed = true;
        let summary = format!("{from} sent close_notify");
        journal.emit(EventKind::CloseNotify, from, summary, Some(CLOSE_NOTIFY_ALERT.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tlsim_crypto::HandshakeSecrets;

    use super::*;

    fn transport(suite: CipherSuite) -> Transport {
        let hash = suite.hash();
        let secrets =
            HandshakeSecrets::derive(hash, &[7u8; 32], &vec![1u8; hash.output_len()]).unwrap();
        let app = secrets.application(&vec![2u8; hash.output_len()]).unwrap();
        Transport::new(
            suite,
            app.client.traffic_keys(suite).unwrap(),
            app.server.traffic_keys(suite).unwrap(),
        )
    }

    #[test]
    fn deliveries_are_fifo_and_decrypt() {
        let mut journal = Journal::default();
        let mut t = transport(CipherSuite::Aes256GcmSha384);

        t.send(&mut journal, Side::Client, b"one").unwrap();
        t.send(&mut journal, Side::Server, b"two").unwrap();
        assert_eq!(t.in_flight(), 2);

        let first = t.receive(&mut journal).unwrap();
        assert_eq!((first.from, first.to), (Side::Client, Side::Server));
        assert_eq!(first.plaintext, b"one");
        let second = t.receive(&mut journal).unwrap();
        assert_eq!(second.plaintext, b"two");
        assert_eq!(t.receive(&mut journal), Err(SessionError::NothingInFlight));
    }

    #[test]
    fn large_message_spans_records() {
        let mut journal = Journal::default();
        let mut t = transport(CipherSuite::Chacha20Poly1305Sha256);
        let message = vec![0x61; MAX_FRAGMENT_LEN + 100];

        let packet = t.send(&mut journal, Side::Client, &message).unwrap();
        assert_eq!(packet.records.len(), 2);
        assert_eq!(t.receive(&mut journal).unwrap().plaintext, message);
    }

    #[test]
    fn closed_transport_rejects_everything() {
        let mut journal = Journal::default();
        let mut t = transport(CipherSuite::Aes128GcmSha256);

        t.close(&mut journal, Side::Client).unwrap();
        assert!(t.is_closed());
        assert!(matches!(
            t.send(&mut journal, Side::Server, b"late"),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(t.receive(&mut journal), Err(SessionError::InvalidState { .. })));
        assert!(matches!(
            t.close(&mut journal, Side::Server),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn connection_cannot_send() {
        let mut journal = Journal::default();
        let mut t = transport(CipherSuite::Aes128GcmSha256);
        assert_eq!(
            t.send(&mut journal, Side::Connection, b"x").unwrap_err(),
            SessionError::InvalidSide { side: Side::Connection, operation: "send" }
        );
    }
}
