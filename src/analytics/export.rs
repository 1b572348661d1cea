//! Trade export
//!
//! Writes reconstructed round trips to trades.csv for downstream consumers.
//! The column order is a compatibility contract and must not change.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use super::reconstruct::RoundTrip;

/// Canonical trades.csv header. Order of columns is contractually
/// significant.
pub const TRADES_HEADER: [&str; 17] = [
    "trade_id",
    "symbol",
    "side",
    "qty",
    "entry_ts",
    "exit_ts",
    "entry_price",
    "exit_price",
    "pnl_usd",
    "pnl_pct",
    "hold_seconds",
    "fees_usd",
    "slippage_bps",
    "decision_id",
    "strategy_name",
    "regime",
    "note",
];

/// Denormalized metadata repeated on every exported row
#[derive(Debug, Clone, Default)]
pub struct ExportMeta {
    pub strategy_name: String,
    pub regime: String,
    pub note: String,
}

fn unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

/// Write trades.csv at `path`. Trade ids are 1-based row numbers.
pub fn write_trades_csv(
    path: impl AsRef<Path>,
    trades: &[RoundTrip],
    meta: &ExportMeta,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{}", TRADES_HEADER.join(","))?;

    for (idx, t) in trades.iter().enumerate() {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            idx + 1,
            t.symbol,
            t.side.as_str(),
            t.qty,
            unix_seconds(t.entry_ts),
            unix_seconds(t.exit_ts),
            t.entry_price,
            t.exit_price,
            t.pnl(),
            t.pnl_pct(),
            t.hold_seconds(),
            t.fees,
            t.slippage_bps,
            t.decision_id.map(|d| d.to_string()).unwrap_or_default(),
            meta.strategy_name,
            meta.regime,
            meta.note,
        )?;
    }
    w.flush()?;
    Ok(())
}
