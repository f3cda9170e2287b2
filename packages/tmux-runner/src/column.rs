//! Columns of panes
//!
//! tmux has no notion of a column. Here a column is one or more panes stacked
//! on top of each other, identified by the pane at its top:
//!
//! ```text
//! +---+---+---+
//! | 0 |   |   |
//! +---+ 2 | 3 |
//! | 1 |   |   |
//! +---+---+---+
//! ```
//!
//! has three columns: panes 0 and 1, pane 2, and pane 3. A layout like
//!
//! ```text
//! +---+---+---+
//! | 0 | 1 |   |
//! +---+---+ 3 |
//! |   2   |   |
//! +-------+---+
//! ```
//!
//! also counts as three, since every pane touching the top edge starts a column.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::runner::Runner;

const LIST_TOP_PANES: &str = "list-panes -F '#{pane_id} #{pane_width}' -f '#{m:#{pane_at_top},1}'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// ID of the pane at the top of this column (e.g. "%0")
    pub pane: String,
    pub width: u32,
}

impl Runner {
    pub async fn list_columns(&mut self) -> Result<Vec<Column>> {
        let output = self.run(LIST_TOP_PANES).await?;
        parse_columns(LIST_TOP_PANES, &output)
    }
}

fn parse_columns(command: &str, output: &str) -> Result<Vec<Column>> {
    output
        .lines()
        .map(|line| {
            let parse_error = |reason: &str| Error::Parse {
                command: command.to_string(),
                line: line.to_string(),
                reason: reason.to_string(),
            };

            let tokens: Vec<&str> = line.split(' ').collect();
            if tokens.len() != 2 {
                return Err(parse_error("expected pane id and width separated by a space"));
            }

            let width = tokens[1].parse().map_err(|_| parse_error("invalid width"))?;
            Ok(Column {
                pane: tokens[0].to_string(),
                width,
            })
        })
        .collect()
}
