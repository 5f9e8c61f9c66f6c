//! tlsim binary.
//!
//! # Usage
//!
//! ```bash
//! # Default client, default server with the bundled RSA-2048 certificate
//! tlsim
//!
//! # Policy files, reproducible key material, JSON logs
//! tlsim --client client.cnf --server server.cnf --seed 7 --json
//!
//! # A bundled exercise, one line per handshake transition
//! tlsim --preset full-pqc --step
//! ```

use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use tlsim_cli::{RunOptions, run, write_json, write_text};
use tlsim_core::{presets, script};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// TLS 1.3 handshake simulator
#[derive(Parser, Debug)]
#[command(name = "tlsim")]
#[command(about = "Simulate a TLS 1.3 handshake between two configured endpoints")]
#[command(version)]
struct Args {
    /// Client policy file
    #[arg(short, long)]
    client: Option<PathBuf>,

    /// Server policy file, applied over the bundled RSA-2048 identity
    #[arg(short, long)]
    server: Option<PathBuf>,

    /// Start from a bundled preset (see --list-presets)
    #[arg(short, long)]
    preset: Option<String>,

    /// List bundled presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Seed deterministic key material instead of OS randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Script of CLIENT_SEND / SERVER_SEND / *_DISCONNECT lines
    #[arg(long)]
    script: Option<PathBuf>,

    /// Client message of the default interaction
    #[arg(long, default_value = script::DEFAULT_CLIENT_MESSAGE)]
    client_message: String,

    /// Server reply of the default interaction
    #[arg(long, default_value = script::DEFAULT_SERVER_MESSAGE)]
    server_message: String,

    /// Print the state reached by every handshake transition
    #[arg(long)]
    step: bool,

    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut out = io::stdout().lock();

    if args.list_presets {
        for preset in presets::all() {
            writeln!(out, "{:<12} {}", preset.id, preset.title)?;
            writeln!(out, "{:<12} {}", "", preset.observe)?;
        }
        return Ok(());
    }

    let options = RunOptions {
        client: args.client,
        server: args.server,
        preset: args.preset,
        seed: args.seed,
        script: args.script,
        client_message: args.client_message,
        server_message: args.server_message,
    };
    let report = run(&options)?;

    if args.json {
        write_json(&mut out, &report)?;
    } else {
        write_text(&mut out, &report, args.step)?;
    }
    out.flush()?;

    Ok(())
}
