//! Policy loading and one simulated run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;
use tlsim_core::{
    Command, CryptoRecorder, EventLog, FixedKeys, HandshakeState, KeySource, NegotiationResult,
    PacketLog, RunRecord, ScriptError, Session, SessionError, SystemKeys, parse_script, presets,
};
use tlsim_proto::{ConfigError, EndpointPolicy, config};

/// Failure of the runner before or while driving a session.
#[derive(Error, Debug)]
pub enum CliError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Policy file did not parse
    #[error("{}: {source}", path.display())]
    Config {
        /// Offending path
        path: PathBuf,
        /// Parser error
        source: ConfigError,
    },

    /// Script file did not parse
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Engine rejected a call
    #[error(transparent)]
    Session(#[from] SessionError),

    /// `--preset` named nothing known
    #[error("unknown preset {0:?}")]
    UnknownPreset(String),
}

/// Everything a run needs besides the key source.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Client policy file; defaults apply when absent
    pub client: Option<PathBuf>,
    /// Server policy file; defaults apply when absent
    pub server: Option<PathBuf>,
    /// Preset supplying both policies before the files are applied
    pub preset: Option<String>,
    /// Deterministic key material seed; OS randomness when absent
    pub seed: Option<u64>,
    /// Script file replacing the default interaction
    pub script: Option<PathBuf>,
    /// Client message of the default interaction
    pub client_message: String,
    /// Server reply of the default interaction
    pub server_message: String,
}

/// Logs and summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// State after each `advance`
    pub steps: Vec<HandshakeState>,
    /// Handshake outcome
    pub outcome: Option<NegotiationResult>,
    /// Protocol events
    pub events: EventLog,
    /// Crypto trace
    pub crypto: CryptoRecorder,
    /// Wire packets
    pub packets: PacketLog,
    /// Summary row
    pub record: RunRecord,
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

fn load_policy(path: &Path, base: EndpointPolicy) -> Result<EndpointPolicy, CliError> {
    let text = read(path)?;
    config::parse_onto(base, &text)
        .map_err(|source| CliError::Config { path: path.to_path_buf(), source })
}

/// Client and server policies: the preset (or defaults), with each side
/// replaced by its file when given.
///
/// The default server presents the bundled RSA-2048 certificate, and a server
/// file without an `Identity` key keeps it.
pub fn load_policies(options: &RunOptions) -> Result<(EndpointPolicy, EndpointPolicy), CliError> {
    let (mut client, mut server) = match &options.preset {
        Some(id) => {
            let preset = presets::find(id).ok_or_else(|| CliError::UnknownPreset(id.clone()))?;
            tracing::info!(preset = preset.id, title = preset.title, "using preset");
            (preset.client, preset.server)
        },
        None => (EndpointPolicy::default(), EndpointPolicy::default_server()),
    };

    if let Some(path) = &options.client {
        client = load_policy(path, EndpointPolicy::default())?;
    }
    if let Some(path) = &options.server {
        server = load_policy(path, EndpointPolicy::default_server())?;
    }
    Ok((client, server))
}

/// Post-handshake commands: the script file, or the default interaction.
pub fn load_commands(options: &RunOptions) -> Result<Vec<Command>, CliError> {
    match &options.script {
        Some(path) => Ok(parse_script(&read(path)?)?),
        None => Ok(Command::full_interaction(
            options.client_message.clone(),
            options.server_message.clone(),
        )),
    }
}

/// Load everything, run the handshake step by step and play the commands
/// if it established.
pub fn run(options: &RunOptions) -> Result<Report, CliError> {
    let (client, server) = load_policies(options)?;
    let commands = load_commands(options)?;

    match options.seed {
        Some(seed) => execute(client, server, FixedKeys::from_seed(seed), &commands),
        None => execute(client, server, SystemKeys, &commands),
    }
}

fn execute<K: KeySource>(
    client: EndpointPolicy,
    server: EndpointPolicy,
    keys: K,
    commands: &[Command],
) -> Result<Report, CliError> {
    let mut session = Session::new(client, server, keys);

    let mut steps = Vec::new();
    loop {
        let state = session.advance()?;
        steps.push(state);
        if state.is_terminal() {
            break;
        }
    }

    if session.is_established() {
        session.run_script(commands)?;
    }

    let record = RunRecord::new(
        1,
        session.client_policy(),
        session.server_policy(),
        session.outcome(),
        session.packets(),
    );
    tracing::info!(
        success = record.success,
        events = session.events().len(),
        bytes = record.total_bytes,
        "run finished"
    );

    Ok(Report {
        steps,
        outcome: session.outcome().cloned(),
        events: session.events().clone(),
        crypto: session.crypto().clone(),
        packets: session.packets().clone(),
        record,
    })
}
