//! zewi - command-line client for the zewi admin API.
//!
//! Runs an interactive shell around a single session: the session is seeded
//! from the local snapshot, verified against the server in the background,
//! and then driven by login/logout/profile commands.

mod app;
mod shell;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use shell::ShellCommand;
use zewi_core::Config;

#[derive(Parser, Debug)]
#[command(name = "zewi", version, about = "Command-line client for the zewi admin API")]
struct Cli {
    /// API base URL (overrides config and ZEWI_API_BASE_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Keep the user snapshot in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive shell (default)
    Shell,
    /// Verify the saved session with the server and print the user
    Whoami,
    /// Print the route table
    Routes,
    /// Check whether navigation to a path would be allowed
    Open { path: String },
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "zewi.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default();
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());
    info!("zewi starting");

    let config = load_config(&cli);
    let mut app = App::new(config, cli.ephemeral)?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(&mut app).await?,
        Command::Whoami => shell::execute(&mut app, ShellCommand::Whoami).await?,
        Command::Routes => shell::execute(&mut app, ShellCommand::Routes).await?,
        Command::Open { path } => shell::execute(&mut app, ShellCommand::Open { path }).await?,
    }

    info!("zewi shutting down");
    Ok(())
}
