use crate::{
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_config::settings::Settings;
use engine_runtime::execution::{executor, inspect};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser, Debug)]
#[command(
    name = "slotwatch",
    version,
    about = "Beacon chain slot ingestion and validator stats"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true, help = "Beacon node URL (overrides SLOTWATCH_BEACON_URL)")]
    beacon_url: Option<String>,

    #[arg(long, global = true, help = "State directory (overrides SLOTWATCH_DATA_DIR)")]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Log level (overrides SLOTWATCH_LOG_LEVEL)")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) -> Result<(), CliError> {
        if let Some(url) = &self.beacon_url {
            settings.beacon_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        Ok(settings.validate()?)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    cli.apply(&mut settings)?;
    init_tracing(&settings.log_level);

    let code = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&settings).await?,
        Commands::Status { json, recent } => {
            let status = inspect::status(&settings, recent).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                output::print_status(&status);
            }
            ExitCode::Success
        }
        Commands::Stats { json } => {
            let snapshot = inspect::latest_stats(&settings).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                output::print_stats(snapshot.as_ref());
            }
            ExitCode::Success
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code.as_i32());
    }
    Ok(())
}

async fn run(settings: &Settings) -> Result<ExitCode, CliError> {
    let coordinator = ShutdownCoordinator::new(CancellationToken::new());
    coordinator.register_handlers();

    let summary = executor::run(settings, coordinator.cancel_token()).await?;
    output::print_summary(&summary);

    if summary.interrupted || coordinator.is_shutdown_requested() {
        Ok(ExitCode::ShutdownRequested)
    } else {
        Ok(ExitCode::Success)
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
