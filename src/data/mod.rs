//! Replay input loaders
//!
//! CSV history for OHLC bars and strategy decision rows. Market-data
//! acquisition itself lives outside this system; these loaders only read
//! what an upstream fetcher already captured.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::execution::Intent;
use crate::risk::Regime;

/// One OHLC bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// One strategy decision row for replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRow {
    pub ts: DateTime<Utc>,
    pub intent: Intent,
    pub strength: Decimal,
    pub regime: Regime,
}

/// Replay input errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("replay input io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed input row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

fn malformed(line: usize, reason: impl Into<String>) -> DataError {
    DataError::MalformedRow {
        line,
        reason: reason.into(),
    }
}

fn parse_ts(line: usize, field: &str) -> Result<DateTime<Utc>, DataError> {
    DateTime::parse_from_rfc3339(field)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| malformed(line, format!("bad timestamp: {e}")))
}

fn parse_num(line: usize, name: &str, field: &str) -> Result<Decimal, DataError> {
    Decimal::from_str(field).map_err(|e| malformed(line, format!("bad {name}: {e}")))
}

/// Load bars from a CSV with header `ts,open,high,low,close`.
pub fn load_bars_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let reader = BufReader::new(File::open(path)?);
    let mut bars = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            return Err(malformed(line_no, "expected 5 fields"));
        }
        bars.push(Bar {
            ts: parse_ts(line_no, fields[0])?,
            open: parse_num(line_no, "open", fields[1])?,
            high: parse_num(line_no, "high", fields[2])?,
            low: parse_num(line_no, "low", fields[3])?,
            close: parse_num(line_no, "close", fields[4])?,
        });
    }
    Ok(bars)
}

/// Load decision rows from a CSV with header `ts,intent,strength,regime`.
/// Unknown intent labels normalize to flat, unknown regimes to the
/// baseline.
pub fn load_decisions_csv(path: impl AsRef<Path>) -> Result<Vec<DecisionRow>, DataError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(malformed(line_no, "expected 4 fields"));
        }
        rows.push(DecisionRow {
            ts: parse_ts(line_no, fields[0])?,
            intent: Intent::parse(fields[1]),
            strength: parse_num(line_no, "strength", fields[2])?,
            regime: Regime::parse(fields[3]),
        });
    }
    Ok(rows)
}
