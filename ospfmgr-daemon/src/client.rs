//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

// Access to the external routing daemon's line-oriented VTY protocol.
//
// The daemon is a synchronous, blocking collaborator with no retry policy; a
// failed call surfaces immediately to the caller. Configuration is applied
// imperatively (`configure`), and all structured reads go through a fresh
// `running_config` or `show` round-trip, never a daemon-side cache.
pub trait DaemonClient: Send {
    // Fetches the full running-configuration text.
    fn running_config(&mut self) -> Result<String, ClientError>;

    // Applies a sequence of configuration commands. Mode-entering commands
    // ("router ...", "interface ...") take effect for the commands that
    // follow them, exactly as on the daemon's console.
    fn configure(&mut self, commands: &[String]) -> Result<(), ClientError>;

    // Runs a single show command and returns its (JSON) output.
    fn show(&mut self, command: &str) -> Result<String, ClientError>;

    // Asks the daemon to reload its configuration from scratch.
    fn reload(&mut self) -> Result<(), ClientError>;
}

// Daemon access errors.
#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    // The daemon rejected a command.
    Rejected(String, String),
}

// ===== impl ClientError =====

impl ClientError {
    pub fn log(&self) {
        match self {
            ClientError::Io(error) => {
                warn!(%error, "{}", self);
            }
            ClientError::Rejected(command, message) => {
                warn!(%command, %message, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(..) => {
                write!(f, "failed to reach the routing daemon")
            }
            ClientError::Rejected(..) => {
                write!(f, "command rejected by the routing daemon")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> ClientError {
        ClientError::Io(error)
    }
}
