//! Configuration types for risk-pilot

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub vol_target: VolTargetConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub kelly: KellyConfig,
    #[serde(default)]
    pub fees: FeesConfig,
    #[serde(default)]
    pub guards: GuardConfig,
    pub ledger: LedgerConfig,
    pub telemetry: TelemetryConfig,
}

/// Engine / instrument configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Instrument symbol, e.g. "BTCUSDT"
    pub symbol: String,
    /// Minimum price increment for the instrument
    pub tick_size: Decimal,
    /// Stop distance as a multiple of ATR
    #[serde(default = "default_atr_multiple")]
    pub atr_multiple: Decimal,
}

fn default_atr_multiple() -> Decimal {
    Decimal::new(25, 1) // 2.5
}

/// Volatility-target calibration configuration.
///
/// Immutable per calibration epoch; only the `calibrate` subcommand produces
/// a new scaling constant `k`.
#[derive(Debug, Clone, Deserialize)]
pub struct VolTargetConfig {
    /// Target annualized volatility, e.g. 0.20
    #[serde(default = "default_target_vol")]
    pub target_annualized_vol: Decimal,
    /// Bars of history used for volatility estimation
    #[serde(default = "default_lookback_bars")]
    pub lookback_bars: usize,
    /// EWMA decay for realized-vol estimation
    #[serde(default = "default_ewma_lambda")]
    pub ewma_lambda: Decimal,
    /// ATR smoothing period
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Lower bound on risk per trade in basis points
    #[serde(default = "default_risk_bps_min")]
    pub risk_bps_min: Decimal,
    /// Upper bound on risk per trade in basis points
    #[serde(default = "default_risk_bps_max")]
    pub risk_bps_max: Decimal,
    /// Tuned scaling constant from the calibrator
    #[serde(default = "default_k")]
    pub k: Decimal,
}

fn default_target_vol() -> Decimal {
    Decimal::new(20, 2) // 0.20
}
fn default_lookback_bars() -> usize {
    100
}
fn default_ewma_lambda() -> Decimal {
    Decimal::new(94, 2) // 0.94
}
fn default_atr_period() -> usize {
    20
}
fn default_risk_bps_min() -> Decimal {
    Decimal::new(5, 0)
}
fn default_risk_bps_max() -> Decimal {
    Decimal::new(100, 0)
}
fn default_k() -> Decimal {
    Decimal::ONE
}

impl Default for VolTargetConfig {
    fn default() -> Self {
        Self {
            target_annualized_vol: default_target_vol(),
            lookback_bars: default_lookback_bars(),
            ewma_lambda: default_ewma_lambda(),
            atr_period: default_atr_period(),
            risk_bps_min: default_risk_bps_min(),
            risk_bps_max: default_risk_bps_max(),
            k: default_k(),
        }
    }
}

/// Position sizing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Sizing mode: "vol_target" or "kelly"
    #[serde(default)]
    pub mode: SizingMode,
    /// Base risk fraction of equity per trade
    #[serde(default = "default_base_risk")]
    pub base_risk: Decimal,
}

/// Sizing mode for position sizing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    #[default]
    VolTarget,
    Kelly,
}

fn default_base_risk() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: SizingMode::VolTarget,
            base_risk: default_base_risk(),
        }
    }
}

/// Kelly overlay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KellyConfig {
    /// Lower clamp on the Kelly fraction, as a multiple of base risk
    #[serde(default = "default_kelly_min")]
    pub kelly_min: Decimal,
    /// Upper clamp on the Kelly fraction, as a multiple of base risk
    #[serde(default = "default_kelly_max")]
    pub kelly_max: Decimal,
    /// Shrinkage divisor applied to the raw Kelly fraction
    #[serde(default = "default_kelly_shrink")]
    pub shrink: Decimal,
}

fn default_kelly_min() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_kelly_max() -> Decimal {
    Decimal::new(4, 0)
}
fn default_kelly_shrink() -> Decimal {
    Decimal::new(20, 0)
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            kelly_min: default_kelly_min(),
            kelly_max: default_kelly_max(),
            shrink: default_kelly_shrink(),
        }
    }
}

/// Fee and slippage configuration, basis points per side
#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    #[serde(default = "default_fee_bps")]
    pub fee_bps: Decimal,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
}

fn default_fee_bps() -> Decimal {
    Decimal::new(5, 0)
}
fn default_slippage_bps() -> Decimal {
    Decimal::new(1, 0)
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            fee_bps: default_fee_bps(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// Drawdown and loss-streak guard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Drawdown at which sizing starts scaling down
    #[serde(default = "default_soft_dd")]
    pub soft_drawdown: Decimal,
    /// Drawdown at which sizing goes to zero
    #[serde(default = "default_hard_dd")]
    pub hard_drawdown: Decimal,
    /// Consecutive losing cycles before sizing is cut off
    #[serde(default = "default_max_losses")]
    pub max_consecutive_losses: u32,
}

fn default_soft_dd() -> Decimal {
    Decimal::new(10, 2) // 0.10
}
fn default_hard_dd() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_max_losses() -> u32 {
    4
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            soft_drawdown: default_soft_dd(),
            hard_drawdown: default_hard_dd(),
            max_consecutive_losses: default_max_losses(),
        }
    }
}

/// Ledger persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Path to the append-only journal CSV
    pub journal_path: PathBuf,
    /// Path to the persisted-state JSON snapshot
    pub state_path: PathBuf,
    /// Starting cash for a fresh ledger
    #[serde(default = "default_start_cash")]
    pub start_cash: Decimal,
    /// Record a mark-to-market row while a position is held
    #[serde(default = "default_true")]
    pub mark_to_market: bool,
}

fn default_start_cash() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_true() -> bool {
    true
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [engine]
            symbol = "BTCUSDT"
            tick_size = 0.5
            atr_multiple = 2.0

            [vol_target]
            target_annualized_vol = 0.20
            lookback_bars = 100
            ewma_lambda = 0.94
            atr_period = 14
            risk_bps_min = 5.0
            risk_bps_max = 100.0
            k = 1.25

            [sizing]
            mode = "kelly"
            base_risk = 0.01

            [fees]
            fee_bps = 5.0
            slippage_bps = 1.0

            [ledger]
            journal_path = "./ledger.csv"
            state_path = "./state.json"
            start_cash = 10000.0

            [telemetry]
            metrics_port = 9090
            log_level = "info"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.symbol, "BTCUSDT");
        assert_eq!(config.vol_target.k, dec!(1.25));
        assert_eq!(config.sizing.mode, SizingMode::Kelly);
        assert!(config.ledger.mark_to_market);
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let toml = r#"
            [engine]
            symbol = "ETHUSDT"
            tick_size = 0.01

            [vol_target]

            [ledger]
            journal_path = "./ledger.csv"
            state_path = "./state.json"

            [telemetry]
            metrics_port = 9090
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.atr_multiple, dec!(2.5));
        assert_eq!(config.vol_target.target_annualized_vol, dec!(0.20));
        assert_eq!(config.vol_target.k, Decimal::ONE);
        assert_eq!(config.sizing.mode, SizingMode::VolTarget);
        assert_eq!(config.fees.fee_bps, dec!(5));
        assert_eq!(config.guards.max_consecutive_losses, 4);
        assert_eq!(config.ledger.start_cash, dec!(10000));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
