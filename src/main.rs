//! Readlog - tails rotating log directories and ships extracted records in batches.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use readlog::config::{ConfigError, ConfigLoader, ReaderConfig};
use readlog::reader::{LogReader, ReaderError, Scheduler};
use readlog::sink::{BatchSink, EventSink, JsonLinesSink, TracingEventSink};

#[derive(Parser)]
#[command(
    name = "readlog",
    about = "Tail rotating log directories and publish extracted records",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the log directory and write batches to stdout as JSON lines.
    Run {
        /// Config file; defaults to ./readlog.toml, then the user config dir.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the pulling interval (e.g. 500ms, 5s).
        #[arg(short, long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Validate the configuration and exit.
    Check {
        /// Config file; defaults to ./readlog.toml, then the user config dir.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries the batches.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<ReaderConfig, ConfigError> {
    path.map_or_else(ConfigLoader::new, ConfigLoader::with_path)
        .load()
}

async fn run(config: ReaderConfig, interval: Option<Duration>) -> Result<(), ReaderError> {
    let sink: Arc<dyn BatchSink> = Arc::new(JsonLinesSink::stdout());
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);
    let mut reader = LogReader::new(&config, sink, events)?;

    let scheduler = Scheduler::new();
    let cancel = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        cancel.cancel();
    });

    let interval = interval.unwrap_or(config.pulling_interval);
    tracing::info!(interval = %humantime::format_duration(interval), "Starting reader");
    let result = scheduler
        .every(interval, || reader.process_updates())
        .await;

    let closed = reader.close();
    result.and(closed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, interval } => {
            let config = match load_config(config) {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(error = %err, "Cannot load configuration");
                    return ExitCode::FAILURE;
                }
            };
            match run(config, interval).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    tracing::error!(error = %err, "Reader stopped");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Check { config } => match load_config(config) {
            Ok(config) => {
                println!(
                    "Configuration valid: {} alias(es) reading {}",
                    config.aliases.len(),
                    config.log_directory.display()
                );
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Configuration invalid: {err}");
                ExitCode::FAILURE
            }
        },
    }
}
