//! Report command implementation
//!
//! Reconstructs round trips from the journal, computes performance
//! metrics, and writes the contractual trades.csv.

use clap::Args;
use std::path::PathBuf;

use crate::analytics::{
    compute_report, equity_by_day, exposure_by_day, fills_from_journal, reconstruct_round_trips,
    turnover_by_day, write_trades_csv, ExportMeta,
};
use crate::config::Config;
use crate::ledger::Ledger;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Output directory for trades.csv
    #[arg(long, default_value = "./output")]
    pub output: PathBuf,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Strategy name stamped on exported rows
    #[arg(long, default_value = "vol_target")]
    pub strategy: String,

    /// Regime label stamped on exported rows
    #[arg(long, default_value = "")]
    pub regime: String,
}

impl ReportArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let ledger = Ledger::open(&config.ledger)?;
        let entries = ledger.entries()?;

        let fills = fills_from_journal(
            &config.engine.symbol,
            config.fees.slippage_bps,
            &entries,
        );
        let trades = reconstruct_round_trips(&fills);
        let report = compute_report(
            &trades,
            &equity_by_day(&entries),
            &exposure_by_day(&entries),
            &turnover_by_day(&entries),
        );

        std::fs::create_dir_all(&self.output)?;
        let trades_path = self.output.join("trades.csv");
        let meta = ExportMeta {
            strategy_name: self.strategy.clone(),
            regime: self.regime.clone(),
            note: String::new(),
        };
        write_trades_csv(&trades_path, &trades, &meta)?;
        tracing::info!(path = %trades_path.display(), trades = trades.len(), "exported trades");

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report.format_table());
        }
        Ok(())
    }
}
