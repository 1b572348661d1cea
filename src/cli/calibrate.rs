//! Calibrate command implementation
//!
//! Offline bisection on the vol-target constant k: each probe replays the
//! decision stream with that k and reports the realized annualized
//! volatility of the resulting daily equity returns.

use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::analytics::{annualized_volatility, daily_returns, equity_by_day};
use crate::config::Config;
use crate::data::{load_bars_csv, load_decisions_csv};
use crate::engine::run_replay;
use crate::ledger::Ledger;
use crate::risk::{calibrate_k, CalibrateParams};

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// CSV with bar history (ts,open,high,low,close)
    #[arg(long, default_value = "./data/bars.csv")]
    pub bars: PathBuf,

    /// CSV with decision rows (ts,intent,strength,regime)
    #[arg(long, default_value = "./data/decisions.csv")]
    pub decisions: PathBuf,

    /// Target annualized volatility (defaults to vol_target config)
    #[arg(long)]
    pub target: Option<Decimal>,

    /// Scratch directory for per-probe ledger files
    #[arg(long, default_value = "./calibrate")]
    pub work_dir: PathBuf,
}

impl CalibrateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let bars = load_bars_csv(&self.bars)?;
        let decisions = load_decisions_csv(&self.decisions)?;
        std::fs::create_dir_all(&self.work_dir)?;

        let params = CalibrateParams {
            target: self.target.unwrap_or(config.vol_target.target_annualized_vol),
            ..CalibrateParams::default()
        };
        tracing::info!(target = %params.target, "calibrating vol-target k");

        let handle = tokio::runtime::Handle::current();
        let mut probe = 0usize;
        let k = calibrate_k(
            |k| {
                probe += 1;
                let mut cfg = config.clone();
                cfg.vol_target.k = k;
                cfg.ledger.journal_path = self.work_dir.join(format!("journal_{probe:02}.csv"));
                cfg.ledger.state_path = self.work_dir.join(format!("state_{probe:02}.json"));

                let realized = tokio::task::block_in_place(|| {
                    handle.block_on(probe_realized_vol(&cfg, &bars, &decisions))
                });
                match realized {
                    Ok(vol) => {
                        tracing::info!(probe, %k, realized = %vol, "calibration probe");
                        vol
                    }
                    Err(e) => {
                        tracing::error!(probe, %k, error = %e, "calibration probe failed");
                        Decimal::ZERO
                    }
                }
            },
            &params,
        );

        println!("tuned k = {k}");
        println!("set [vol_target] k = {k} in the config to apply it");
        Ok(())
    }
}

async fn probe_realized_vol(
    cfg: &Config,
    bars: &[crate::data::Bar],
    decisions: &[crate::data::DecisionRow],
) -> anyhow::Result<Decimal> {
    run_replay(cfg, bars, decisions).await?;

    let ledger = Ledger::open(&cfg.ledger)?;
    let rets = daily_returns(&equity_by_day(&ledger.entries()?));
    let realized = annualized_volatility(&rets);
    Ok(Decimal::try_from(realized).unwrap_or(Decimal::ZERO))
}
