use crate::error::Result;
use crate::runner::Runner;

impl Runner {
    /// Set the width of the given pane (e.g. "%3")
    pub async fn set_pane_width(&mut self, pane: &str, width: u32) -> Result<()> {
        self.run(&format!("resize-pane -x '{}' -t '{}'", width, pane))
            .await?;
        Ok(())
    }
}
