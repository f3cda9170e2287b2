//! Command dispatch over a control mode connection
//!
//! Writes one command line, then reads the matching response block. Only one
//! command is ever in flight, which `&mut self` enforces.

use super::framer::{ResponseBlock, ResponseFramer};
use crate::error::{Error, Result};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Request/response channel to a `tmux -C` process.
#[derive(Debug)]
pub struct Dispatcher<W, R> {
    /// Stdin of the control mode process
    writer: W,

    /// Cursor over its stdout
    framer: ResponseFramer<R>,

    /// Per-command limit on waiting for the response
    timeout: Option<Duration>,

    /// Set once the stream position can no longer be trusted
    poisoned: bool,
}

impl<W, R> Dispatcher<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    pub fn new(writer: W, reader: R, timeout: Option<Duration>) -> Self {
        Self {
            writer,
            framer: ResponseFramer::new(reader),
            timeout,
            poisoned: false,
        }
    }

    /// Whether an earlier stream failure made this dispatcher unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Consume a response block that was not requested by a command, such as
    /// the empty block tmux prints when control mode starts.
    pub async fn read_unsolicited(&mut self, label: &str) -> Result<ResponseBlock> {
        self.ensure_usable()?;
        let block = self.read_block(label).await?;
        debug!(label, success = block.success, "consumed unsolicited block");
        Ok(block)
    }

    /// Send a tmux command and wait for its output.
    ///
    /// A `%error` block becomes [`Error::Command`] and leaves the dispatcher
    /// usable. Write, read and timeout failures poison it.
    pub async fn run(&mut self, cmd: &str) -> Result<String> {
        self.ensure_usable()?;
        validate_command(cmd)?;

        if let Err(e) = self.send(cmd).await {
            self.poisoned = true;
            return Err(Error::Stream {
                command: cmd.to_string(),
                source: e,
            });
        }

        let block = self.read_block(cmd).await?;
        if block.success {
            debug!(command = cmd, lines = block.output.lines().count(), "command succeeded");
            Ok(block.output)
        } else {
            debug!(command = cmd, error = %block.output, "command failed");
            Err(Error::Command {
                command: cmd.to_string(),
                message: block.output,
            })
        }
    }

    async fn send(&mut self, cmd: &str) -> io::Result<()> {
        self.writer.write_all(format!("{}\n", cmd).as_bytes()).await?;
        self.writer.flush().await
    }

    async fn read_block(&mut self, cmd: &str) -> Result<ResponseBlock> {
        let read = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.framer.read_response()).await {
                Ok(read) => read,
                Err(_) => {
                    // The abandoned read may have consumed part of a block
                    self.poisoned = true;
                    warn!(command = cmd, ?limit, "timed out waiting for response");
                    return Err(Error::Timeout {
                        command: cmd.to_string(),
                        after: limit,
                    });
                }
            },
            None => self.framer.read_response().await,
        };

        read.map_err(|e| {
            self.poisoned = true;
            warn!(command = cmd, error = %e, "control mode stream failed");
            Error::Stream {
                command: cmd.to_string(),
                source: e,
            }
        })
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        Ok(())
    }
}

/// A command must be exactly one non-empty line: tmux answers every line with
/// its own block, and an empty line detaches the control client.
fn validate_command(cmd: &str) -> Result<()> {
    let reason = if cmd.trim().is_empty() {
        "empty command"
    } else if cmd.contains(['\n', '\r']) {
        "contains a line break"
    } else {
        return Ok(());
    };

    Err(Error::InvalidCommand {
        command: cmd.to_string(),
        reason,
    })
}
