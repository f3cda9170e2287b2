//! Run tmux commands through one control mode process
//!
//! Commands come from the arguments, or one per line from stdin when none are
//! given. Host errors are reported and execution continues; a broken control
//! mode stream stops it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tmux_runner::{Config, Error, Runner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tmux-run",
    about = "Run tmux commands over a persistent control mode connection"
)]
struct Cli {
    /// tmux socket name (tmux -L)
    #[arg(short = 'L', long)]
    socket: Option<String>,

    /// Path to the tmux executable (default: search PATH)
    #[arg(long)]
    tmux: Option<PathBuf>,

    /// Give up on a command after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print one JSON object per command
    #[arg(long)]
    json: bool,

    /// Commands to run; read from stdin if omitted
    commands: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            socket: self.socket.clone(),
            tmux_path: self.tmux.clone(),
            command_timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Serialize)]
struct Outcome<'a> {
    command: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn report(json: bool, command: &str, result: &Result<String, Error>) {
    if json {
        let outcome = match result {
            Ok(output) => Outcome {
                command,
                success: true,
                output: Some(output.as_str()),
                error: None,
            },
            Err(e) => Outcome {
                command,
                success: false,
                output: None,
                error: Some(e.to_string()),
            },
        };
        match serde_json::to_string(&outcome) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("tmux-run: failed to encode result: {}", e),
        }
        return;
    }

    match result {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(e) => eprintln!("tmux-run: {}", e),
    }
}

async fn read_stdin_commands() -> std::io::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut commands = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            commands.push(line.to_string());
        }
    }
    Ok(commands)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let commands = if cli.commands.is_empty() {
        match read_stdin_commands().await {
            Ok(commands) => commands,
            Err(e) => {
                eprintln!("tmux-run: failed to read stdin: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        cli.commands.clone()
    };

    let mut runner = match Runner::init(cli.config()).await {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("tmux-run: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for command in &commands {
        let result = runner.run(command).await;
        report(cli.json, command, &result);

        if let Err(e) = result {
            failed = true;
            if e.is_fatal() {
                break;
            }
        }
    }

    if let Err(e) = runner.close().await {
        eprintln!("tmux-run: failed to close runner: {}", e);
        failed = true;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
