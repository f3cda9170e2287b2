//! Persistent `tmux -C` runner
//!
//! A [`Runner`] starts one control mode process and sends every command
//! through it, instead of spawning `tmux` once per command.
//!
//! ```no_run
//! # async fn demo() -> tmux_runner::Result<()> {
//! use tmux_runner::{Config, Runner};
//!
//! let mut runner = Runner::init(Config::default()).await?;
//! let sessions = runner.run("list-sessions -F '#{session_name}'").await?;
//! println!("{}", sessions);
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! `tmux -C` without a target creates a new session to attach to. `init` finds
//! that scratch session by diffing the session list before and after the
//! process starts, and `close` kills it. If another client creates or kills a
//! session on the same server between the two snapshots, the diff is wrong and
//! `init` fails with [`Error::AmbiguousScratchSession`]; this race is not
//! guarded against.

use std::collections::HashSet;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control_mode::Dispatcher;
use crate::error::{Error, Result};
use crate::executor::TmuxBinary;

pub(crate) const LIST_SESSION_NAMES: &str = "list-sessions -F '#{session_name}'";

type ControlDispatcher = Dispatcher<ChildStdin, BufReader<ChildStdout>>;

#[derive(Debug)]
pub struct Runner {
    config: Config,
    tmux: TmuxBinary,

    /// The tmux -C child process
    child: Child,

    /// Command channel over the child's stdin/stdout
    dispatcher: ControlDispatcher,

    /// Session created by tmux -C, killed on close
    scratch_session: String,

    closed: bool,
}

impl Runner {
    /// Locate tmux for `config` and start a control mode runner.
    pub async fn init(config: Config) -> Result<Self> {
        let tmux = TmuxBinary::locate(&config)?;
        Self::start(config, tmux).await
    }

    /// Start a control mode runner with an already resolved tmux executable.
    ///
    /// Only the executable path of `tmux` is used; the server is always the
    /// one selected by `config`.
    pub async fn start(config: Config, tmux: TmuxBinary) -> Result<Self> {
        let tmux = tmux.for_config(&config);

        // Must be taken before tmux -C creates its session
        let before = session_names_by_command(&tmux).await?;

        let mut child = tmux
            .base_command()
            .arg("-C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::Spawn)?;

        let pipes = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => Ok((stdin, stdout)),
            (None, _) => Err(Error::MissingPipe("stdin")),
            (_, None) => Err(Error::MissingPipe("stdout")),
        };
        let (stdin, stdout) = match pipes {
            Ok(pipes) => pipes,
            Err(e) => {
                kill_child(&mut child).await;
                return Err(e);
            }
        };

        let mut dispatcher = Dispatcher::new(stdin, BufReader::new(stdout), config.command_timeout);

        let scratch_session = match bootstrap(&mut dispatcher, &before).await {
            Ok(name) => name,
            Err(e) => {
                kill_child(&mut child).await;
                return Err(e);
            }
        };
        info!(session = %scratch_session, socket = ?config.socket, "tmux control mode runner started");

        Ok(Self {
            config,
            tmux,
            child,
            dispatcher,
            scratch_session,
            closed: false,
        })
    }

    /// Run a tmux command and return its output.
    ///
    /// Lines are joined with `\n` and there is no trailing newline. An error
    /// whose [`kind`](Error::kind) is `Stream` means this runner is unusable;
    /// drop it and start a new one.
    pub async fn run(&mut self, cmd: &str) -> Result<String> {
        self.dispatcher.run(cmd).await
    }

    /// Kill the scratch session and the tmux -C process.
    ///
    /// The process is killed even if `kill-session` fails; that failure is
    /// what gets returned.
    pub async fn close(mut self) -> Result<()> {
        let cmd = format!("kill-session -t '{}'", self.scratch_session);
        let result = self.dispatcher.run(&cmd).await.map(|_| ());

        kill_child(&mut self.child).await;
        self.closed = true;

        debug!(session = %self.scratch_session, ok = result.is_ok(), "tmux control mode runner closed");
        result
    }

    pub fn scratch_session(&self) -> &str {
        &self.scratch_session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The executable this runner was started with, for one-shot commands
    /// against the same server.
    pub fn tmux(&self) -> &TmuxBinary {
        &self.tmux
    }

    /// OS process id of the tmux -C process, if it has not been reaped yet.
    pub fn process_id(&self) -> Option<u32> {
        self.child.id()
    }

    /// False once a stream failure or timeout has made the runner unusable.
    pub fn is_usable(&self) -> bool {
        !self.dispatcher.is_poisoned()
    }

    /// Check if the tmux -C process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        // kill_on_drop stops the process, but nothing can kill the session here
        if !self.closed {
            warn!(session = %self.scratch_session, "runner dropped without close, scratch session left running");
        }
    }
}

/// Consume the startup block, then find the session tmux -C created.
async fn bootstrap<W, R>(dispatcher: &mut Dispatcher<W, R>, before: &[String]) -> Result<String>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    // tmux -C prints an empty %begin/%end pair as soon as it starts
    let block = dispatcher.read_unsolicited("control mode startup").await?;
    if !block.success {
        return Err(Error::StartupFailed {
            message: block.output,
        });
    }

    let output = dispatcher.run(LIST_SESSION_NAMES).await?;
    let after = parse_session_names(&output);

    find_scratch_session(before, &after)
}

/// Session names from a one-shot `list-sessions`, for use before tmux -C runs.
///
/// A server that is not running yet has no sessions.
async fn session_names_by_command(tmux: &TmuxBinary) -> Result<Vec<String>> {
    match tmux.command(["list-sessions", "-F", "#{session_name}"]).await {
        Ok(output) => Ok(parse_session_names(&output)),
        Err(Error::OneShot { stderr, .. }) if is_no_server(&stderr) => {
            debug!(stderr = %stderr, "no tmux server running yet");
            Ok(Vec::new())
        }
        Err(e) => Err(Error::Snapshot(Box::new(e))),
    }
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running") || stderr.contains("error connecting to")
}

pub(crate) fn parse_session_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The one session present in `after` but not in `before`.
pub fn find_scratch_session(before: &[String], after: &[String]) -> Result<String> {
    let existing: HashSet<&str> = before.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    // Set difference, keeping the order of `after`
    let mut found: Vec<String> = after
        .iter()
        .filter(|name| !existing.contains(name.as_str()) && seen.insert(name.as_str()))
        .cloned()
        .collect();

    if found.len() != 1 {
        return Err(Error::AmbiguousScratchSession { found });
    }
    Ok(found.remove(0))
}

async fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill tmux control mode process");
    }
}
