use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// Program name searched on `PATH` when no explicit path is configured
pub const TMUX_PROGRAM: &str = "tmux";

/// A resolved tmux executable, bound to the server selected by a [`Config`].
///
/// This is the handle every tmux invocation goes through, so that several
/// configurations can resolve and address servers independently.
#[derive(Debug, Clone)]
pub struct TmuxBinary {
    path: PathBuf,
    socket_args: Vec<String>,
}

impl TmuxBinary {
    /// Resolve the tmux executable for `config`.
    ///
    /// An explicit `tmux_path` is checked with the same rules as a `PATH`
    /// search, so a missing or non-executable file is reported the same way.
    pub fn locate(config: &Config) -> Result<Self> {
        let program: PathBuf = config
            .tmux_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(TMUX_PROGRAM));

        let path = which::which(&program).map_err(|source| Error::NotFound {
            program: program.clone(),
            source,
        })?;
        debug!(path = %path.display(), "resolved tmux executable");

        Ok(Self {
            path,
            socket_args: config.socket_args(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The same executable, addressing the server selected by `config`.
    pub fn for_config(&self, config: &Config) -> Self {
        Self {
            path: self.path.clone(),
            socket_args: config.socket_args(),
        }
    }

    pub fn socket_args(&self) -> &[String] {
        &self.socket_args
    }

    /// A `tmux [-L socket]` command, ready for further arguments.
    pub fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(&self.socket_args);
        cmd
    }

    /// Run a one-shot tmux command and return its stdout.
    pub async fn command<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect();

        let output = self
            .base_command()
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| Error::OneShotIo {
                args: args.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::OneShot {
                args,
                stderr: trim_trailing_newline(&stderr).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Strip one trailing newline, if present.
///
/// One-shot tmux output ends with a newline; control mode output does not.
pub fn trim_trailing_newline(s: &str) -> &str {
    s.strip_suffix('\n').unwrap_or(s)
}
