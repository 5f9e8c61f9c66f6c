//! Fuzz target for interaction scripts
//!
//! Arbitrary text is parsed as a script. Parsing must never panic, and an
//! accepted script must never carry more commands than the text has lines.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsim_core::parse_script;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(commands) = parse_script(text) {
        assert!(commands.len() <= text.lines().count());
    }
});
