//! Cronhands - recurring shell job scheduler
//!
//! Main entry point for the cronhands daemon and CLI.

mod cli;
mod cmd_job;
mod cmd_run;

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cronhands_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use cronhands_executor::validate_command;

use cli::{Cli, Commands};

/// Initialize tracing: console output plus, when a log directory is
/// configured, a daily-rotated file.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.directory {
        Some(directory) => {
            let log_dir = ConfigLoader::expand_path(directory);
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cronhands")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Dropping the guard stops the writer thread.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Load the config and reject it on the first validation error.
fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    ConfigValidator::validate(&config).into_result()?;
    Ok(config)
}

fn check_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("Configuration OK");
        Ok(())
    } else {
        Err(format!("{} configuration error(s)", result.errors.len()).into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::CheckConfig) => check_config(config_path),
        Some(Commands::ValidateCommand { command }) => {
            let config = load_config(config_path)?;
            validate_command(&command, &config.executor.allowed_commands)?;
            println!("Command OK");
            Ok(())
        }
        Some(Commands::Job { action }) => {
            let config = load_config(config_path)?;
            init_tracing(&config.logging)?;
            cmd_job::handle_job_command(action, config).await
        }
        None | Some(Commands::Run) => {
            let config = load_config(config_path)?;
            init_tracing(&config.logging)?;
            for warning in ConfigValidator::validate(&config).warnings {
                warn!("Config {}: {}", warning.path, warning.message);
            }
            info!("Starting cronhands v{}", env!("CARGO_PKG_VERSION"));
            cmd_run::run(config).await
        }
    }
}
