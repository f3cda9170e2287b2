use tracing::debug;

use crate::error::Result;
use crate::executor::{trim_trailing_newline, TmuxBinary};
use crate::runner::{parse_session_names, Runner, LIST_SESSION_NAMES};

/// Get the name of the active session.
///
/// Runs as a one-shot command, so it reports the session of the calling
/// client rather than the runner's scratch session.
pub async fn active_session(tmux: &TmuxBinary) -> Result<String> {
    let output = tmux
        .command(["display-message", "-p", "-F", "#{session_name}"])
        .await?;
    Ok(trim_trailing_newline(&output).to_string())
}

impl Runner {
    /// Attach the control mode client to another session
    pub async fn attach_session(&mut self, session_name: &str) -> Result<()> {
        self.run(&format!("attach -t '{}'", session_name)).await?;
        Ok(())
    }

    pub async fn list_sessions(&mut self) -> Result<Vec<String>> {
        let output = self.run(LIST_SESSION_NAMES).await?;
        Ok(parse_session_names(&output))
    }

    /// Start a detached session unless one with this name already exists.
    pub async fn start_session(&mut self, name: &str) -> Result<()> {
        let sessions = self.list_sessions().await?;
        if sessions.iter().any(|s| s == name) {
            debug!(session = name, "session already running");
            return Ok(());
        }

        self.run(&format!("new-session -d -s '{}'", name)).await?;
        Ok(())
    }
}
