//! Run command implementation

use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::data::{load_bars_csv, load_decisions_csv};
use crate::engine::run_replay;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// CSV with bar history (ts,open,high,low,close)
    #[arg(long, default_value = "./data/bars.csv")]
    pub bars: PathBuf,

    /// CSV with decision rows (ts,intent,strength,regime)
    #[arg(long, default_value = "./data/decisions.csv")]
    pub decisions: PathBuf,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let bars = load_bars_csv(&self.bars)?;
        let decisions = load_decisions_csv(&self.decisions)?;
        tracing::info!(
            bars = bars.len(),
            decisions = decisions.len(),
            symbol = %config.engine.symbol,
            "starting paper replay"
        );

        let session = run_replay(config, &bars, &decisions).await?;

        let overview = session.account_overview();
        let trades = session.trades();
        tracing::info!(
            equity = %overview.equity,
            trades = trades.len(),
            "replay complete"
        );

        println!("Equity:      {}", overview.equity);
        println!("Cash:        {}", overview.cash);
        println!("Exposure:    {}", overview.exposure);
        println!("Round trips: {}", trades.len());
        for p in &overview.positions {
            println!(
                "Open: {} {} qty={} entry={} upnl={}",
                p.symbol,
                p.side.as_str(),
                p.qty,
                p.entry_price,
                p.unrealized_pnl
            );
        }
        Ok(())
    }
}
