//! Journal and snapshot persistence
//!
//! The journal is an append-only CSV with the row contract
//! `timestamp,action,side,price,qty,fees,pnl,cash,equity,note`; the snapshot
//! is a JSON file overwritten via tmp-file-and-rename so a crash can never
//! leave a half-written state. Write failures propagate to the caller —
//! the snapshot is the sole source of recoverable truth.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{replay, LedgerAction, LedgerEntry, PersistedState};
use crate::config::LedgerConfig;
use crate::execution::PositionSide;

const JOURNAL_HEADER: &str = "timestamp,action,side,price,qty,fees,pnl,cash,equity,note";

/// Ledger persistence errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization failure: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed journal row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

/// Append-only journal plus overwritable snapshot
pub struct Ledger {
    journal_path: PathBuf,
    state_path: PathBuf,
    start_cash: Decimal,
}

impl Ledger {
    /// Open (or initialize) the ledger files.
    ///
    /// A fresh journal gets its header row; a fresh snapshot gets the
    /// genesis state with the configured starting cash.
    pub fn open(cfg: &LedgerConfig) -> Result<Self, LedgerError> {
        let ledger = Self {
            journal_path: cfg.journal_path.clone(),
            state_path: cfg.state_path.clone(),
            start_cash: cfg.start_cash,
        };

        if !ledger.journal_path.exists() {
            let mut file = File::create(&ledger.journal_path)?;
            writeln!(file, "{JOURNAL_HEADER}")?;
        }
        if !ledger.state_path.exists() {
            ledger.write_snapshot(&PersistedState::genesis(cfg.start_cash))?;
        }
        Ok(ledger)
    }

    pub fn start_cash(&self) -> Decimal {
        self.start_cash
    }

    /// Append one journal row, then overwrite the snapshot.
    pub fn record(&self, entry: &LedgerEntry, state: &PersistedState) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new().append(true).open(&self.journal_path)?;
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{}",
            entry.ts.to_rfc3339(),
            entry.action.as_str(),
            entry
                .side
                .map(|s| s.as_str().to_ascii_uppercase())
                .unwrap_or_default(),
            entry.price,
            entry.qty,
            entry.fees,
            entry.pnl,
            entry.cash,
            entry.equity,
            entry.note,
        )?;
        self.write_snapshot(state)
    }

    /// Read the full journal back, in append order.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let file = File::open(&self.journal_path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if idx == 0 || line.trim().is_empty() {
                continue;
            }
            entries.push(parse_row(idx + 1, &line)?);
        }
        Ok(entries)
    }

    /// Load the current snapshot.
    pub fn snapshot(&self) -> Result<PersistedState, LedgerError> {
        let file = File::open(&self.state_path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Rebuild the snapshot by replaying the journal from genesis.
    pub fn replay(&self) -> Result<PersistedState, LedgerError> {
        Ok(replay(self.start_cash, &self.entries()?))
    }

    fn write_snapshot(&self, state: &PersistedState) -> Result<(), LedgerError> {
        let tmp = self.state_path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, state)?;
            file.flush()?;
        }
        std::fs::rename(&tmp, &self.state_path)?;
        Ok(())
    }
}

fn parse_row(line_no: usize, line: &str) -> Result<LedgerEntry, LedgerError> {
    let malformed = |reason: &str| LedgerError::MalformedRow {
        line: line_no,
        reason: reason.to_string(),
    };

    let fields: Vec<&str> = line.splitn(10, ',').collect();
    if fields.len() != 10 {
        return Err(malformed("expected 10 fields"));
    }

    let ts = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| malformed(&format!("bad timestamp: {e}")))?
        .with_timezone(&Utc);
    let action =
        LedgerAction::parse(fields[1]).ok_or_else(|| malformed("unknown action"))?;
    let side = match fields[2] {
        "" => None,
        "LONG" => Some(PositionSide::Long),
        "SHORT" => Some(PositionSide::Short),
        other => return Err(malformed(&format!("unknown side {other:?}"))),
    };

    let num = |i: usize, name: &str| -> Result<Decimal, LedgerError> {
        Decimal::from_str(fields[i]).map_err(|e| malformed(&format!("bad {name}: {e}")))
    };

    Ok(LedgerEntry {
        ts,
        action,
        side,
        price: num(3, "price")?,
        qty: num(4, "qty")?,
        fees: num(5, "fees")?,
        pnl: num(6, "pnl")?,
        cash: num(7, "cash")?,
        equity: num(8, "equity")?,
        note: fields[9].to_string(),
    })
}
