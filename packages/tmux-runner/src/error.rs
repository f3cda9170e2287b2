//! Error type shared by the runner, the one-shot executor and the helpers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Broad category of a failure, for callers that need to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `Runner::init` could not produce a usable runner.
    Bootstrap,
    /// tmux rejected a command. The runner is still usable.
    Protocol,
    /// The control mode pipes failed. The runner must be discarded.
    Stream,
    /// tmux answered, but the answer could not be interpreted.
    Parse,
    /// A one-shot `tmux <args>` invocation failed outside of any runner.
    OneShot,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("tmux executable not found: {program}")]
    NotFound {
        program: PathBuf,
        #[source]
        source: which::Error,
    },

    #[error("failed to start tmux control mode: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("tmux control mode process has no {0} handle")]
    MissingPipe(&'static str),

    #[error("tmux {args:?} failed: {stderr}")]
    OneShot { args: Vec<String>, stderr: String },

    #[error("failed to execute tmux {args:?}: {source}")]
    OneShotIo {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list sessions before starting control mode: {0}")]
    Snapshot(#[source] Box<Error>),

    #[error("tmux control mode failed to start: {message}")]
    StartupFailed { message: String },

    #[error("expected exactly 1 new session but found {}: {}", .found.len(), .found.join(","))]
    AmbiguousScratchSession { found: Vec<String> },

    #[error("tmux error running '{command}': {message}")]
    Command { command: String, message: String },

    #[error("refusing to send {command:?}: {reason}")]
    InvalidCommand { command: String, reason: &'static str },

    #[error("control mode stream failed running '{command}': {source}")]
    Stream {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("control mode stream is unusable after an earlier failure")]
    Poisoned,

    #[error("unexpected output from '{command}': {line:?} ({reason})")]
    Parse {
        command: String,
        line: String,
        reason: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. }
            | Error::Spawn(_)
            | Error::MissingPipe(_)
            | Error::Snapshot(_)
            | Error::StartupFailed { .. }
            | Error::AmbiguousScratchSession { .. } => ErrorKind::Bootstrap,
            Error::Command { .. } | Error::InvalidCommand { .. } => ErrorKind::Protocol,
            Error::Stream { .. } | Error::Timeout { .. } | Error::Poisoned => ErrorKind::Stream,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::OneShot { .. } | Error::OneShotIo { .. } => ErrorKind::OneShot,
        }
    }

    /// True when the runner that produced this error must not be used again.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Stream
    }
}

pub type Result<T> = std::result::Result<T, Error>;
