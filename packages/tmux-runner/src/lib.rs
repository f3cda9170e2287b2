//! Drive tmux through a persistent control mode (`tmux -C`) process.
//!
//! See [`Runner`] for the entry point. The helpers in `session`, `window`,
//! `pane` and `column` are methods on `Runner` built on [`Runner::run`].

pub mod column;
pub mod config;
pub mod control_mode;
pub mod error;
pub mod executor;
pub mod pane;
pub mod runner;
pub mod session;
pub mod window;

pub use column::Column;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use executor::{trim_trailing_newline, TmuxBinary};
pub use runner::{find_scratch_session, Runner};
pub use session::active_session;
