//! Wire-level framing of protocol events.
//!
//! Every event that carries a payload becomes a [`WirePacket`]: the record
//! type, whether an observer could read it, and the records it splits into.
//! Events without a payload (`init`, `key_exchange`, `negotiation_result`)
//! produce no packet.
//!
//! Protected records carry the inner content type byte and the AEAD tag on
//! top of the fragment, and each record holds at most 2^14 plaintext bytes.

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tlsim_proto::{
    PayloadKind, RecordHeader, RecordType,
    record::{AEAD_TAG_LEN, MAX_FRAGMENT_LEN},
};

use crate::event::{EventKind, ProtocolEvent, Side};

/// Direction the packet was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// Leaving the sender
    Sent,
    /// Arriving at the receiver
    Received,
}

/// Framing of one payload-bearing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WirePacket {
    /// Ordinal of the event the packet frames
    pub event: u64,
    /// Kind of that event
    pub kind: EventKind,
    /// Endpoint that put the bytes on the wire
    pub sender: Side,
    /// Sent or received view
    pub observation: Observation,
    /// Record content type
    pub record_type: RecordType,
    /// Readable or protected
    pub payload_kind: PayloadKind,
    /// Plaintext bytes carried
    pub fragment_len: usize,
    /// Body length of each record, including AEAD overhead
    pub records: Vec<usize>,
}

impl WirePacket {
    /// Total bytes on the wire including record headers.
    pub fn wire_len(&self) -> usize {
        self.records.iter().map(|len| RecordHeader::SIZE + len).sum()
    }

    /// Record headers in order.
    pub fn record_headers(&self) -> Vec<RecordHeader> {
        self.records.iter().map(|&len| RecordHeader::new(self.record_type, len as u16)).collect()
    }

    /// Concatenated record headers as they would appear on the wire.
    pub fn header_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.records.len() * RecordHeader::SIZE);
        for header in self.record_headers() {
            header.encode(&mut buf);
        }
        buf.freeze()
    }
}

/// Maps events to packets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireFramer;

impl WireFramer {
    /// Packet for `event`, or `None` if the event is local.
    pub fn frame(event: &ProtocolEvent) -> Option<WirePacket> {
        let fragment_len = event.payload_len?;
        let (record_type, payload_kind) = Self::classify(event.kind)?;

        let (sender, observation) = match event.kind {
            EventKind::MessageReceived => (event.side.peer(), Observation::Received),
            _ => (event.side, Observation::Sent),
        };

        Some(WirePacket {
            event: event.ordinal,
            kind: event.kind,
            sender,
            observation,
            record_type,
            payload_kind,
            fragment_len,
            records: Self::records(fragment_len, payload_kind),
        })
    }

    /// Record type and visibility of each payload-bearing kind.
    pub fn classify(kind: EventKind) -> Option<(RecordType, PayloadKind)> {
        match kind {
            EventKind::ClientHello | EventKind::ServerHello => {
                Some((RecordType::Handshake, PayloadKind::Plaintext))
            },
            EventKind::CertificateVerify | EventKind::Finished => {
                Some((RecordType::Handshake, PayloadKind::OpaqueCiphertext))
            },
            EventKind::MessageSent | EventKind::MessageReceived => {
                Some((RecordType::ApplicationData, PayloadKind::OpaqueCiphertext))
            },
            EventKind::CloseNotify => Some((RecordType::Alert, PayloadKind::OpaqueCiphertext)),
            EventKind::Init | EventKind::KeyExchange | EventKind::NegotiationResult => None,
        }
    }

    /// Body lengths of the records needed for `len` plaintext bytes.
    pub fn records(len: usize, payload_kind: PayloadKind) -> Vec<usize> {
        let overhead = match payload_kind {
            PayloadKind::Plaintext => 0,
            PayloadKind::OpaqueCiphertext => 1 + AEAD_TAG_LEN,
        };

        if len == 0 {
            return vec![overhead];
        }

        let mut records = Vec::with_capacity(len.div_ceil(MAX_FRAGMENT_LEN));
        let mut remaining = len;
        while remaining > 0 {
            let fragment = remaining.min(MAX_FRAGMENT_LEN);
            records.push(fragment + overhead);
            remaining -= fragment;
        }
        records
    }
}

/// Packets in the order their events were appended.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PacketLog {
    packets: Vec<WirePacket>,
}

impl PacketLog {
    pub(crate) fn push(&mut self, packet: WirePacket) -> &WirePacket {
        tracing::trace!(
            event = packet.event,
            kind = %packet.kind,
            sender = %packet.sender,
            bytes = packet.wire_len(),
            "packet"
        );
        self.packets.push(packet);
        &self.packets[self.packets.len() - 1]
    }

    /// Number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// `true` when nothing has been framed.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets in order.
    pub fn iter(&self) -> impl Iterator<Item = &WirePacket> {
        self.packets.iter()
    }

    /// Packets observed leaving their sender. Each wire transmission appears
    /// here exactly once.
    pub fn sent(&self) -> impl Iterator<Item = &WirePacket> {
        self.packets.iter().filter(|p| p.observation == Observation::Sent)
    }

    /// Wire bytes of sent packets of one record type.
    pub fn sent_bytes(&self, record_type: RecordType) -> usize {
        self.sent().filter(|p| p.record_type == record_type).map(WirePacket::wire_len).sum()
    }

    /// Wire bytes of every sent packet.
    pub fn total_sent_bytes(&self) -> usize {
        self.sent().map(WirePacket::wire_len).sum()
    }
}
