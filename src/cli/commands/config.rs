//! Config CLI command implementation.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate a configuration file (or the layered configuration)
    Validate {
        /// File to validate; defaults to .kosmos/ plus environment overrides
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|e| format!("Failed to render configuration: {e}"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub source: String,
    pub valid: bool,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        format!("Configuration is valid ({})", self.source)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source,
            "valid": self.valid,
        })
    }
}

pub async fn execute(args: ConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            output(
                &ConfigShowOutput {
                    config: config.clone(),
                },
                json_mode,
            );
        }
        ConfigCommands::Validate { path } => {
            let source = match path {
                Some(path) => {
                    ConfigLoader::load_from_file(&path)?;
                    path.display().to_string()
                }
                None => {
                    ConfigLoader::load()?;
                    "layered".to_string()
                }
            };
            output(
                &ConfigValidateOutput {
                    source,
                    valid: true,
                },
                json_mode,
            );
        }
    }
    Ok(())
}
