//! Volatility estimators over OHLC history
//!
//! Money and price ratios stay in `Decimal`; logarithms and square roots go
//! through f64 and convert back, since they only feed statistical estimates.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TRADING_DAYS: f64 = 252.0;

/// Wilder-smoothed Average True Range.
///
/// True range = max(high − low, |high − prev_close|, |low − prev_close|).
/// Seeded with the first true range, then atr = (atr·(n−1) + tr) / n with
/// n = min(period, available true ranges). Returns 0 when fewer than
/// `period + 1` bars exist.
pub fn atr(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal], period: usize) -> Decimal {
    let len = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || len < period + 1 {
        return Decimal::ZERO;
    }

    let mut trs = Vec::with_capacity(len - 1);
    for i in 1..len {
        let tr1 = highs[i] - lows[i];
        let tr2 = (highs[i] - closes[i - 1]).abs();
        let tr3 = (lows[i] - closes[i - 1]).abs();
        trs.push(tr1.max(tr2).max(tr3));
    }

    let n = period.min(trs.len());
    let mut value = trs[0];
    for tr in trs.iter().take(n).skip(1) {
        value = (value * Decimal::from(n as u64 - 1) + tr) / Decimal::from(n as u64);
    }
    value
}

/// Log returns over consecutive positive closes. Pairs with a non-positive
/// close on either side are skipped.
pub fn log_returns(closes: &[Decimal]) -> Vec<Decimal> {
    let mut rets = Vec::with_capacity(closes.len().saturating_sub(1));
    for i in 1..closes.len() {
        if closes[i - 1] > Decimal::ZERO && closes[i] > Decimal::ZERO {
            let ratio: f64 = (closes[i] / closes[i - 1]).try_into().unwrap_or(0.0);
            if ratio > 0.0 {
                if let Ok(r) = Decimal::try_from(ratio.ln()) {
                    rets.push(r);
                }
            }
        }
    }
    rets
}

/// Rolling return volatility: population standard deviation of log returns
/// over the trailing `period` returns.
///
/// Returns 0 below 2 usable returns or fewer than `period + 1` closes.
pub fn return_volatility(closes: &[Decimal], period: usize) -> Decimal {
    if closes.len() < period + 1 {
        return Decimal::ZERO;
    }

    let rets = log_returns(closes);
    if rets.len() < 2 {
        return Decimal::ZERO;
    }

    let window = &rets[rets.len().saturating_sub(period)..];
    let n = Decimal::from(window.len() as u64);
    let mean: Decimal = window.iter().sum::<Decimal>() / n;
    let var: Decimal = window.iter().map(|r| (*r - mean) * (*r - mean)).sum::<Decimal>() / n;

    let var_f: f64 = var.try_into().unwrap_or(0.0);
    Decimal::try_from(var_f.sqrt()).unwrap_or(Decimal::ZERO)
}

/// Hybrid volatility: equal-weight blend of normalized ATR and return vol.
///
/// Returns 0 if price is not positive.
pub fn hybrid_volatility(atr: Decimal, return_vol: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (atr / price) * dec!(0.5) + return_vol * dec!(0.5)
}

/// EWMA realized volatility over the trailing `lookback` returns,
/// annualized by sqrt(252). Newest return carries the largest weight.
pub fn ewma_volatility(returns: &[Decimal], lambda: Decimal, lookback: usize) -> Decimal {
    if returns.is_empty() || lookback == 0 {
        return Decimal::ZERO;
    }
    let lam: f64 = lambda.try_into().unwrap_or(0.94);
    if !(0.0..1.0).contains(&lam) {
        return Decimal::ZERO;
    }

    let window = &returns[returns.len().saturating_sub(lookback)..];
    let mut weights: Vec<f64> = (0..window.len()).map(|i| lam.powi(i as i32)).collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }

    // newest last in the slice, weight index 0 is the newest observation
    let r2_weighted: f64 = window
        .iter()
        .rev()
        .zip(weights.iter())
        .map(|(r, w)| {
            let rf: f64 = (*r).try_into().unwrap_or(0.0);
            rf * rf * w
        })
        .sum();

    let sigma_daily = ((1.0 - lam) * r2_weighted.max(0.0)).sqrt();
    Decimal::try_from(sigma_daily * TRADING_DAYS.sqrt()).unwrap_or(Decimal::ZERO)
}
