//! Kosmos CLI entry point.

use clap::Parser;

use kosmos::cli::{Cli, Commands};
use kosmos::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = kosmos::cli::load_config(cli.config.as_deref());
    let log_config = config
        .as_ref()
        .ok()
        .and_then(|c| LogConfig::try_from(&c.logging).ok())
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match config {
        Ok(config) => match cli.command {
            Commands::Replay(args) => {
                kosmos::cli::commands::replay::execute(args, &config, cli.json).await
            }
            Commands::Config(args) => {
                kosmos::cli::commands::config::execute(args, &config, cli.json).await
            }
        },
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        kosmos::cli::handle_error(&err, cli.json);
    }
}
