use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for a [`Runner`](crate::Runner) and the one-shot executor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket name passed as `tmux -L <socket>`. `None` uses the default server.
    pub socket: Option<String>,

    /// Explicit tmux executable. When unset, `tmux` is looked up on `PATH`.
    pub tmux_path: Option<PathBuf>,

    /// Upper bound on how long a single command may wait for its response.
    /// A runner whose command timed out is poisoned.
    #[serde(default, with = "millis")]
    pub command_timeout: Option<Duration>,
}

impl Config {
    pub fn with_socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    pub fn with_tmux_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmux_path = Some(path.into());
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Leading `-L <socket>` arguments, if a socket is configured.
    pub fn socket_args(&self) -> Vec<String> {
        match &self.socket {
            Some(socket) if !socket.is_empty() => vec!["-L".to_string(), socket.clone()],
            _ => Vec::new(),
        }
    }
}

// Timeouts are written as plain milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
