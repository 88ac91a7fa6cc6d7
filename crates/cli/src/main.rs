//! CartJO CLI - storefront coordination tools

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cartjo")]
#[command(about = "CartJO storefront coordination tools")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: OutputFormat,

    /// Configuration file (TOML or YAML); environment variables override it
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for one-shot commands in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level, cli.log_format)?;

    let config = config::load(cli.config.as_deref())?;
    info!(api = %config.api_link, "starting cartjo");

    // The server runs until interrupted; everything else is bounded.
    let bounded = cli.timeout > 0 && !cli.command.is_long_running();
    let outcome = if bounded {
        let limit = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(limit, cli.command.execute(config)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    } else {
        cli.command.execute(config).await
    };

    if let Err(e) = outcome {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}
