//! Command-line interface for operator tooling around the services config.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "conductor",
    about = "Service lifecycle supervisor tooling",
    version
)]
pub struct Cli {
    /// Path to the services config document
    #[arg(short, long, global = true, default_value = "services.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse the config and validate every service's dependencies
    Validate,

    /// Print the startup order with priorities and enabled flags
    Order,
}
