//! Fuzz target for the policy text format
//!
//! Arbitrary text is parsed as a policy file. The parser must never panic,
//! and every policy it accepts uses standard identities and bundled or
//! demo-root anchors, so it must render and parse back to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsim_proto::config;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(policy) = config::parse(text) else {
        return;
    };

    let rendered = config::render(&policy).expect("parsed policies are representable");
    let reparsed = config::parse(&rendered).expect("rendered policies parse");
    assert_eq!(reparsed, policy);
});
