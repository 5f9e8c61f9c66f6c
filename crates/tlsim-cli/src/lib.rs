//! Runner behind the `tlsim` binary.
//!
//! Loads two policy files (or a preset), drives one session to completion,
//! plays the post-handshake commands and renders the three logs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod output;
pub mod runner;

pub use output::{outcome_line, write_json, write_text};
pub use runner::{CliError, Report, RunOptions, load_commands, load_policies, run};
