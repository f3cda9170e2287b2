use crate::error::{Error, Result};
use crate::runner::Runner;

const ACTIVE_WINDOW_ID: &str = "list-windows -F '#{window_id}' -f '#{m:#{window_active},1}'";
const ACTIVE_WINDOW_SIZE: &str =
    "list-windows -F '#{window_width} #{window_height}' -f '#{m:#{window_active},1}'";

impl Runner {
    /// ID of the active window, e.g. "@0"
    pub async fn active_window(&mut self) -> Result<String> {
        self.run(ACTIVE_WINDOW_ID).await
    }

    /// `(width, height)` of the active window
    pub async fn active_window_dimensions(&mut self) -> Result<(u32, u32)> {
        let output = self.run(ACTIVE_WINDOW_SIZE).await?;
        parse_dimensions(ACTIVE_WINDOW_SIZE, &output)
    }
}

fn parse_dimensions(command: &str, output: &str) -> Result<(u32, u32)> {
    let parse_error = |reason: &str| Error::Parse {
        command: command.to_string(),
        line: output.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = output.trim().split(' ').collect();
    if parts.len() != 2 {
        return Err(parse_error("expected width and height separated by a space"));
    }

    let width = parts[0].parse().map_err(|_| parse_error("invalid width"))?;
    let height = parts[1].parse().map_err(|_| parse_error("invalid height"))?;

    Ok((width, height))
}
