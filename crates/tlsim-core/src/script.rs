//! Post-handshake interaction scripts.
//!
//! One command per line:
//!
//! ```text
//! CLIENT_SEND: Hello Server (Encrypted)
//! SERVER_SEND: Hello Client (Encrypted)
//! CLIENT_DISCONNECT
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Command names are
//! case-insensitive; message text is kept verbatim after the colon and one
//! optional space.

use serde::{Deserialize, Serialize};

use crate::{error::ScriptError, event::Side};

/// Message the client sends in a default interaction.
pub const DEFAULT_CLIENT_MESSAGE: &str = "Hello Server (Encrypted)";

/// Message the server answers with in a default interaction.
pub const DEFAULT_SERVER_MESSAGE: &str = "Hello Client (Encrypted)";

/// One step of a scripted interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Client sends, server receives
    ClientSend(String),
    /// Server sends, client receives
    ServerSend(String),
    /// Client sends `close_notify`
    ClientDisconnect,
    /// Server sends `close_notify`
    ServerDisconnect,
}

impl Command {
    /// Client message, server reply, client disconnect.
    pub fn full_interaction(
        client_message: impl Into<String>,
        server_message: impl Into<String>,
    ) -> Vec<Self> {
        vec![
            Self::ClientSend(client_message.into()),
            Self::ServerSend(server_message.into()),
            Self::ClientDisconnect,
        ]
    }

    /// Endpoint that performs the command.
    pub fn actor(&self) -> Side {
        match self {
            Self::ClientSend(_) | Self::ClientDisconnect => Side::Client,
            Self::ServerSend(_) | Self::ServerDisconnect => Side::Server,
        }
    }
}

/// Parse a script.
///
/// # Errors
///
/// - `ScriptError::UnknownCommand` for a line that is not a command
pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let line = line.trim_start();
        let (name, message) = match line.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest.strip_prefix(' ').unwrap_or(rest))),
            None => (line, None),
        };

        let command = match (name.to_ascii_uppercase().as_str(), message) {
            ("CLIENT_SEND", Some(message)) => Command::ClientSend(message.to_string()),
            ("SERVER_SEND", Some(message)) => Command::ServerSend(message.to_string()),
            ("CLIENT_DISCONNECT", None) => Command::ClientDisconnect,
            ("SERVER_DISCONNECT", None) => Command::ServerDisconnect,
            _ => {
                return Err(ScriptError::UnknownCommand {
                    line: index + 1,
                    content: raw.to_string(),
                });
            },
        };
        commands.push(command);
    }
    Ok(commands)
}
