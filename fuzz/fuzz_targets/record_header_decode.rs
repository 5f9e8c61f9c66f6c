//! Fuzz target for RecordHeader::from_bytes
//!
//! Arbitrary byte sequences are decoded as a record header to find:
//! - Panics on short or malformed input
//! - Headers accepted with an unknown content type or legacy version
//! - Length fields above the ciphertext limit that pass validation
//!
//! Accepted headers must re-encode to the bytes they were decoded from.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsim_proto::{RecordHeader, record::MAX_CIPHERTEXT_LEN};

fuzz_target!(|data: &[u8]| {
    let Ok(header) = RecordHeader::from_bytes(data) else {
        return;
    };

    assert!(header.record_type().is_some());
    assert!(usize::from(header.length()) <= MAX_CIPHERTEXT_LEN);
    assert_eq!(&header.to_bytes()[..], &data[..RecordHeader::SIZE]);
});
