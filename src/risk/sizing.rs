//! Adaptive position sizing
//!
//! Vol-target sizing: a hybrid volatility estimate and a regime scalar set a
//! target notional, while the calibrated risk-bps path converts a stop
//! distance into an order quantity. The engine takes the more conservative
//! of the two.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::VolTargetConfig;

const EPS: Decimal = dec!(0.000000001);

/// Qualitative market-state label used to scale risk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Trend,
    Chop,
    Neutral,
}

impl Regime {
    /// Parse a regime label; unknown labels map to the baseline.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "trend" => Regime::Trend,
            "chop" => Regime::Chop,
            _ => Regime::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Trend => "trend",
            Regime::Chop => "chop",
            Regime::Neutral => "neutral",
        }
    }
}

/// Sizing multiplier per regime: lean into trends, cut back in chop.
pub fn regime_scalar(regime: Regime) -> Decimal {
    match regime {
        Regime::Trend => dec!(1.40),
        Regime::Chop => dec!(0.65),
        Regime::Neutral => dec!(1.00),
    }
}

/// Core vol-target sizing: notional = equity·target_vol·scalar / hybrid_vol.
///
/// Returns 0 when hybrid_vol is not positive — no sizing signal rather than
/// a division error.
pub fn target_notional(
    equity: Decimal,
    hybrid_vol: Decimal,
    scalar: Decimal,
    target_vol: Decimal,
) -> Decimal {
    if hybrid_vol <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    equity * target_vol * scalar / hybrid_vol
}

/// Risk budget in basis points from annualized volatility.
///
/// Scaled so that typical sigma in [0.10, 0.40] maps to roughly [20, 5] bps
/// at k = 1, then clipped to the configured bounds.
pub fn risk_bps_from_vol(
    sigma_annualized: Decimal,
    target_vol: Decimal,
    k: Decimal,
    min_bps: Decimal,
    max_bps: Decimal,
) -> Decimal {
    let sigma = sigma_annualized.max(EPS);
    let bps = k * target_vol / sigma * dec!(10);
    bps.clamp(min_bps, max_bps)
}

/// Stop distance in ticks: ceil(atr_multiple·atr / tick_size), at least 1.
pub fn stop_distance_ticks(atr: Decimal, tick_size: Decimal, atr_multiple: Decimal) -> u64 {
    if tick_size <= Decimal::ZERO {
        return 1;
    }
    let ticks = (atr_multiple * atr / tick_size).ceil();
    ticks.to_u64().unwrap_or(1).max(1)
}

/// Order quantity from the risk-bps budget and a stop distance in price
/// units. Returns (quantity, risk_bps).
pub fn order_quantity_from_risk(
    equity: Decimal,
    stop_distance_price: Decimal,
    sigma_annualized: Decimal,
    cfg: &VolTargetConfig,
) -> (Decimal, Decimal) {
    let risk_bps = risk_bps_from_vol(
        sigma_annualized,
        cfg.target_annualized_vol,
        cfg.k,
        cfg.risk_bps_min,
        cfg.risk_bps_max,
    );
    let risk_dollars = equity * risk_bps / dec!(10000);
    let qty = risk_dollars / stop_distance_price.max(EPS);
    (qty, risk_bps)
}

/// A complete sizing decision for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePlan {
    /// Order quantity in base units
    pub qty: Decimal,
    /// Stop distance in ticks
    pub stop_ticks: u64,
    /// Stop distance in price units
    pub stop_distance: Decimal,
    /// Risk budget used, in basis points
    pub risk_bps: Decimal,
    /// Vol-target notional cap in quote units
    pub notional_cap: Decimal,
}

/// Combines the volatility estimators and the calibrated risk budget into a
/// per-cycle sizing plan
#[derive(Debug, Clone)]
pub struct AdaptiveSizer {
    cfg: VolTargetConfig,
    tick_size: Decimal,
    atr_multiple: Decimal,
}

impl AdaptiveSizer {
    pub fn new(cfg: VolTargetConfig, tick_size: Decimal, atr_multiple: Decimal) -> Self {
        Self {
            cfg,
            tick_size,
            atr_multiple,
        }
    }

    /// Replace the calibrated scaling constant (offline recalibration).
    pub fn set_k(&mut self, k: Decimal) {
        self.cfg.k = k;
    }

    pub fn config(&self) -> &VolTargetConfig {
        &self.cfg
    }

    /// Build the sizing plan for one cycle.
    ///
    /// The quantity is the risk-bps quantity capped by the vol-target
    /// notional; a zero or negative price yields a zero plan.
    pub fn plan(
        &self,
        equity: Decimal,
        price: Decimal,
        hybrid_vol: Decimal,
        sigma_annualized: Decimal,
        atr: Decimal,
        regime: Regime,
    ) -> SizePlan {
        let stop_ticks = stop_distance_ticks(atr, self.tick_size, self.atr_multiple);
        let stop_distance = Decimal::from(stop_ticks) * self.tick_size;

        if price <= Decimal::ZERO {
            return SizePlan {
                qty: Decimal::ZERO,
                stop_ticks,
                stop_distance,
                risk_bps: self.cfg.risk_bps_min,
                notional_cap: Decimal::ZERO,
            };
        }

        let (risk_qty, risk_bps) =
            order_quantity_from_risk(equity, stop_distance, sigma_annualized, &self.cfg);

        let cap = target_notional(
            equity,
            hybrid_vol,
            regime_scalar(regime),
            self.cfg.target_annualized_vol,
        );
        let cap_qty = cap / price;

        let qty = if cap_qty > Decimal::ZERO {
            risk_qty.min(cap_qty)
        } else {
            Decimal::ZERO
        };

        SizePlan {
            qty,
            stop_ticks,
            stop_distance,
            risk_bps,
            notional_cap: cap,
        }
    }
}
