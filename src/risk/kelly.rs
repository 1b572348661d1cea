//! Kelly criterion sizing overlay
//!
//! Converts realized trade statistics (win rate, expectancy) into a capital
//! fraction, with shrinkage and clamping so the overlay can never dominate
//! the base risk budget.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::KellyConfig;

const EPS: Decimal = dec!(0.000001);

/// Kelly fraction for a (win_rate, avg_win, avg_loss) payoff profile.
///
/// f* = (b·p − q) / b with b = avg_win/|avg_loss| and q = 1 − p.
/// Returns 0 when avg_loss ≤ 0 or the payoff carries no information.
pub fn kelly_fraction(win_rate: Decimal, avg_win: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss <= Decimal::ZERO || avg_win + avg_loss == Decimal::ZERO {
        return Decimal::ZERO;
    }
    let b = avg_win / avg_loss.abs();
    let p = win_rate.clamp(Decimal::ZERO, Decimal::ONE);
    let q = Decimal::ONE - p;
    ((b * p - q) / b).max(Decimal::ZERO)
}

/// Approximate Kelly from expectancy and win rate.
///
/// Backs out an implied average loss assuming avg_win ≈ 2·|avg_loss| via
/// denom = max(ε, 3p − 1), then shrinks the raw fraction.
pub fn kelly_from_expectancy(expectancy: Decimal, win_rate: Decimal, shrink: Decimal) -> Decimal {
    let p = win_rate.clamp(Decimal::ZERO, Decimal::ONE);
    let denom = (dec!(3) * p - Decimal::ONE).max(EPS);
    let avg_loss = expectancy / denom;
    let avg_win = dec!(2) * avg_loss;
    kelly_fraction(p, avg_win, avg_loss) / shrink.max(Decimal::ONE)
}

/// Kelly sizing overlay over a base risk fraction
#[derive(Debug, Clone)]
pub struct KellyOverlay {
    enabled: bool,
    cfg: KellyConfig,
    base_risk: Decimal,
}

impl KellyOverlay {
    pub fn new(enabled: bool, cfg: KellyConfig, base_risk: Decimal) -> Self {
        Self {
            enabled,
            cfg,
            base_risk,
        }
    }

    /// Sizing fraction of equity for the next open.
    ///
    /// Disabled overlay returns the base risk unchanged; enabled overlay
    /// clamps the expectancy-implied Kelly between kelly_min·base and
    /// kelly_max·base.
    pub fn size_fraction(&self, win_rate: Decimal, expectancy: Decimal) -> Decimal {
        if !self.enabled {
            return self.base_risk;
        }
        let k = kelly_from_expectancy(expectancy, win_rate, self.cfg.shrink);
        k.clamp(
            self.cfg.kelly_min * self.base_risk,
            self.cfg.kelly_max * self.base_risk,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelly_fraction_no_loss_estimate() {
        // avg_loss <= 0 means no edge estimate, for any p
        for p in [dec!(0), dec!(0.3), dec!(0.5), dec!(0.9), dec!(1)] {
            assert_eq!(kelly_fraction(p, dec!(10), Decimal::ZERO), Decimal::ZERO);
            assert_eq!(kelly_fraction(p, dec!(10), dec!(-5)), Decimal::ZERO);
        }
    }

    #[test]
    fn test_kelly_fraction_known_value() {
        // b = 2, p = 0.6, q = 0.4 -> (1.2 - 0.4)/2 = 0.4
        assert_eq!(kelly_fraction(dec!(0.6), dec!(20), dec!(10)), dec!(0.4));
    }

    #[test]
    fn test_kelly_fraction_negative_edge_floors_at_zero() {
        // b = 1, p = 0.3 -> (0.3 - 0.7)/1 < 0 -> 0
        assert_eq!(kelly_fraction(dec!(0.3), dec!(10), dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn test_kelly_fraction_clamps_win_rate() {
        let over = kelly_fraction(dec!(1.5), dec!(20), dec!(10));
        let exact = kelly_fraction(dec!(1.0), dec!(20), dec!(10));
        assert_eq!(over, exact);
    }

    #[test]
    fn test_kelly_from_expectancy_positive() {
        // p=0.6, E=4: denom = 0.8, loss = 5, win = 10 -> kelly 0.4, shrink 20 -> 0.02
        let k = kelly_from_expectancy(dec!(4), dec!(0.6), dec!(20));
        assert_eq!(k, dec!(0.02));
    }

    #[test]
    fn test_kelly_from_expectancy_negative_expectancy() {
        // implied losses are negative, fraction collapses to zero
        let k = kelly_from_expectancy(dec!(-5), dec!(0.6), dec!(20));
        assert_eq!(k, Decimal::ZERO);
    }

    #[test]
    fn test_kelly_from_expectancy_shrink_floor() {
        // shrink below 1 behaves as 1
        let a = kelly_from_expectancy(dec!(4), dec!(0.6), dec!(0.5));
        let b = kelly_from_expectancy(dec!(4), dec!(0.6), dec!(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_overlay_disabled_returns_base_risk() {
        let overlay = KellyOverlay::new(false, KellyConfig::default(), dec!(0.01));
        assert_eq!(overlay.size_fraction(dec!(0.9), dec!(100)), dec!(0.01));
    }

    #[test]
    fn test_overlay_clamps_between_bounds() {
        let overlay = KellyOverlay::new(true, KellyConfig::default(), dec!(0.01));

        // hopeless stats clamp to the lower bound 0.25 * 0.01
        let low = overlay.size_fraction(dec!(0.1), dec!(-10));
        assert_eq!(low, dec!(0.0025));

        // strong stats clamp to the upper bound 4 * 0.01
        let high = overlay.size_fraction(dec!(0.99), dec!(10000));
        assert!(high <= dec!(0.04));
        assert!(high >= dec!(0.0025));
    }
}
