//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::config::ConfigArgs;
use crate::cli::commands::replay::ReplayArgs;

#[derive(Parser, Debug)]
#[command(name = "kosmos")]
#[command(about = "Kosmos - research loop control plane", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .kosmos/ plus KOSMOS_* overrides)
    #[arg(short, long, global = true, env = "KOSMOS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded research session through the control plane
    Replay(ReplayArgs),

    /// Configuration commands
    Config(ConfigArgs),
}
