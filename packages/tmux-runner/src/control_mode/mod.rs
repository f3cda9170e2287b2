//! Tmux Control Mode Protocol
//!
//! `tmux -C` reads commands as text lines on stdin and answers each one with a
//! `%begin`/`%end` (or `%error`) block on stdout.
//!
//! ## Key components:
//! - `framer` - Extract one response block from the output stream
//! - `dispatcher` - Send a command and read back its block, one at a time

mod dispatcher;
mod framer;

pub use dispatcher::Dispatcher;
pub use framer::{ResponseBlock, ResponseFramer};
