//! CLI interface for risk-pilot
//!
//! Provides subcommands for:
//! - `run`: replay a decision stream through the paper execution loop
//! - `calibrate`: tune the vol-target scaling constant k
//! - `report`: reconstruct trades, compute metrics, export trades.csv
//! - `status`: show the persisted position snapshot
//! - `config`: show the effective configuration

mod calibrate;
mod report;
mod run;

pub use calibrate::CalibrateArgs;
pub use report::ReportArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "risk-pilot")]
#[command(about = "Adaptive volatility-target risk sizing and paper execution loop")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a decision stream through the paper execution loop
    Run(RunArgs),
    /// Tune the vol-target scaling constant k against history
    Calibrate(CalibrateArgs),
    /// Reconstruct trades, compute metrics, export trades.csv
    Report(ReportArgs),
    /// Show the persisted position snapshot
    Status,
    /// Show the effective configuration
    Config,
}
