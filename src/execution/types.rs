//! Execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, −1 for short
    pub fn sign(&self) -> Decimal {
        match self {
            PositionSide::Long => Decimal::ONE,
            PositionSide::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

/// Strategy intent for the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Long,
    Short,
    Flat,
}

impl Intent {
    /// Parse an intent label; anything that is not long/short normalizes
    /// to flat.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "long" => Intent::Long,
            "short" => Intent::Short,
            _ => Intent::Flat,
        }
    }

    pub fn as_side(&self) -> Option<PositionSide> {
        match self {
            Intent::Long => Some(PositionSide::Long),
            Intent::Short => Some(PositionSide::Short),
            Intent::Flat => None,
        }
    }
}

/// Directive action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Open,
    Close,
}

/// Position-change directive.
///
/// Produced once per routing cycle and consumed exactly once by the
/// position executor. A flip is a single `open` with `flip = true`; the
/// executor closes the prior leg first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub action: Action,
    pub side: Option<PositionSide>,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub stop: Decimal,
    pub flip: bool,
}

impl Directive {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            side: None,
            qty: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            stop: Decimal::ZERO,
            flip: false,
        }
    }
}

/// Side of a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSide {
    Buy,
    Sell,
}

/// An executed fill. The ordered fill stream is the source of truth for
/// realized activity and for trade reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub side: FillSide,
    pub qty: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub slippage_bps: Decimal,
    pub decision_id: Option<Uuid>,
}
