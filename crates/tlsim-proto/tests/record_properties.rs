//! Property-based tests for record header decoding.

use proptest::prelude::*;
use tlsim_proto::{ProtocolError, RecordHeader, RecordType, record::MAX_CIPHERTEXT_LEN};

fn arbitrary_record_type() -> impl Strategy<Value = RecordType> {
    prop_oneof![
        Just(RecordType::Alert),
        Just(RecordType::Handshake),
        Just(RecordType::ApplicationData),
    ]
}

proptest! {
    #[test]
    fn valid_headers_decode(
        record_type in arbitrary_record_type(),
        length in 0u16..=(MAX_CIPHERTEXT_LEN as u16),
    ) {
        let header = RecordHeader::new(record_type, length);
        let bytes = header.to_bytes();
        let decoded = RecordHeader::from_bytes(&bytes).unwrap();

        prop_assert_eq!(decoded.record_type(), Some(record_type));
        prop_assert_eq!(decoded.length(), length);
    }

    #[test]
    fn oversized_length_rejected(
        record_type in arbitrary_record_type(),
        length in (MAX_CIPHERTEXT_LEN as u16 + 1)..=u16::MAX,
    ) {
        let bytes = RecordHeader::new(record_type, length).to_bytes();
        let is_too_large = matches!(
            RecordHeader::from_bytes(&bytes),
            Err(ProtocolError::RecordTooLarge { .. })
        );
        prop_assert!(is_too_large);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..16)) {
        let _ = RecordHeader::from_bytes(&bytes);
    }

    #[test]
    fn encode_appends_exact_bytes(record_type in arbitrary_record_type(), length in any::<u16>()) {
        let header = RecordHeader::new(record_type, length);
        let mut buf = Vec::new();
        header.encode(&mut buf);
        let expected = header.to_bytes();
        prop_assert_eq!(buf.as_slice(), expected.as_slice());
    }
}
