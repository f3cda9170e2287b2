//! Response framing for tmux control mode
//!
//! Every command accepted by `tmux -C` is answered with a block:
//! - `%begin <tag>` - start of the response
//! - zero or more output lines
//! - `%end <tag>` on success, `%error <tag>` on failure
//!
//! Notification lines (`%output`, `%sessions-changed`, ...) can show up before
//! the `%begin` line and are skipped.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::trace;

const BEGIN_MARKER: &str = "%begin ";
const END_MARKER: &str = "%end";
const ERROR_MARKER: &str = "%error";

/// One complete response block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBlock {
    /// Body lines joined with `\n`, without the framing lines
    pub output: String,
    /// `true` for `%end`, `false` for `%error`
    pub success: bool,
}

/// Line cursor over the control mode output stream.
///
/// Owns the reader; each [`read_response`](Self::read_response) call consumes
/// exactly the lines of one response block.
#[derive(Debug)]
pub struct ResponseFramer<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> ResponseFramer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Read the next line, lossily decoded with trailing `\r`/`\n` removed.
    ///
    /// Uses `read_until(b'\n')` instead of `lines()` so that non-UTF-8 bytes in
    /// pane content cannot fail the read.
    async fn next_line(&mut self) -> io::Result<String> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "tmux control mode stream closed",
            ));
        }

        while self.buf.last() == Some(&b'\n') || self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        Ok(String::from_utf8_lossy(&self.buf).into_owned())
    }

    /// Read one response block.
    ///
    /// Any read failure, including EOF, is returned as is. The stream position
    /// is unknown afterwards and the framer must not be used again.
    pub async fn read_response(&mut self) -> io::Result<ResponseBlock> {
        // Before output: everything up to the %begin line is a notification
        let tag = loop {
            let line = self.next_line().await?;
            if let Some(tag) = line.strip_prefix(BEGIN_MARKER) {
                break tag.to_string();
            }
            trace!(line = %line, "skipping line outside response block");
        };

        let end_line = format!("{} {}", END_MARKER, tag);
        let error_line = format!("{} {}", ERROR_MARKER, tag);
        let mut lines: Vec<String> = Vec::new();

        loop {
            let line = self.next_line().await?;
            let success = if line == end_line {
                true
            } else if line == error_line {
                false
            } else {
                lines.push(line);
                continue;
            };

            return Ok(ResponseBlock {
                output: lines.join("\n"),
                success,
            });
        }
    }
}
