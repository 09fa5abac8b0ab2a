use serde::{Deserialize, Serialize};

use crate::{Error, Result, TradingMode};

/// Strategy and risk parameters. Immutable for the lifetime of a
/// `StrategyController`; validated once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fractional gain at which an open position is closed (0.02 = 2%).
    pub profit_target_pct: f64,
    /// Fractional loss at which an open position is closed (0.01 = 1%).
    pub stop_loss_pct: f64,
    /// Maximum completed entries per trading date.
    pub max_daily_trades: u32,
    /// Contracts per position. Every entry uses exactly this quantity.
    pub max_position_size: u32,
    /// Bars with a smaller high-to-low range are treated as noise.
    pub min_price_movement: f64,
    /// Warm-up length and volatility window for the band filter.
    pub lookback_periods: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profit_target_pct: 0.02,
            stop_loss_pct: 0.01,
            max_daily_trades: 5,
            max_position_size: 1,
            min_price_movement: 0.25,
            lookback_periods: 200,
        }
    }
}

impl EngineConfig {
    /// Validate every field and report *all* problems in a single error,
    /// not just the first one found.
    pub fn validate(&self) -> Result<()> {
        let mut faults: Vec<String> = Vec::new();

        if self.profit_target_pct <= 0.0 {
            faults.push(format!(
                "profit_target_pct must be positive, got {}",
                self.profit_target_pct
            ));
        }
        if self.stop_loss_pct <= 0.0 {
            faults.push(format!(
                "stop_loss_pct must be positive, got {}",
                self.stop_loss_pct
            ));
        }
        if self.profit_target_pct <= self.stop_loss_pct {
            faults.push(format!(
                "profit_target_pct ({}) must exceed stop_loss_pct ({})",
                self.profit_target_pct, self.stop_loss_pct
            ));
        }
        if self.max_daily_trades == 0 {
            faults.push("max_daily_trades must be at least 1".to_string());
        }
        if self.max_position_size == 0 {
            faults.push("max_position_size must be at least 1".to_string());
        }
        if self.min_price_movement < 0.0 {
            faults.push(format!(
                "min_price_movement must not be negative, got {}",
                self.min_price_movement
            ));
        }
        if self.lookback_periods < 2 {
            faults.push(format!(
                "lookback_periods must be at least 2, got {}",
                self.lookback_periods
            ));
        }

        if faults.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(faults.join("; ")))
        }
    }
}

/// All process configuration, loaded from environment variables at startup.
/// Loading collects every missing or malformed variable into one error so a
/// broken deployment is reported in full on the first run.
#[derive(Debug, Clone)]
pub struct Config {
    // Broker credentials
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub account_id: String,

    // Trading
    pub symbol: String,
    pub bar_size: String,
    pub trading_mode: TradingMode,
    pub paper_slippage_bps: f64,

    // State snapshot written between cycles
    pub state_path: String,

    pub engine: EngineConfig,
}

impl Config {
    /// Load all configuration from environment variables, reading `.env`
    /// first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let mut faults: Vec<String> = Vec::new();

        let mut required = |key: &str| -> String {
            match std::env::var(key) {
                Ok(v) if !v.trim().is_empty() => v,
                _ => {
                    faults.push(format!("missing required variable {key}"));
                    String::new()
                }
            }
        };

        let api_key = required("TRADOVATE_API_KEY");
        let client_id = required("TRADOVATE_CLIENT_ID");
        let client_secret = required("TRADOVATE_CLIENT_SECRET");
        let username = required("TRADOVATE_USERNAME");
        let password = required("TRADOVATE_PASSWORD");
        let account_id = required("TRADOVATE_ACCOUNT_ID");

        let trading_mode = match optional("TRADING_MODE").as_deref() {
            None | Some("paper") => TradingMode::Paper,
            Some("live") => TradingMode::Live,
            Some(other) => {
                faults.push(format!(
                    "TRADING_MODE must be 'paper' or 'live', got '{other}'"
                ));
                TradingMode::Paper
            }
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            profit_target_pct: parse_or(
                "PROFIT_TARGET",
                defaults.profit_target_pct,
                &mut faults,
            ),
            stop_loss_pct: parse_or("STOP_LOSS", defaults.stop_loss_pct, &mut faults),
            max_daily_trades: parse_or(
                "MAX_DAILY_TRADES",
                defaults.max_daily_trades,
                &mut faults,
            ),
            max_position_size: parse_or(
                "MAX_POSITION_SIZE",
                defaults.max_position_size,
                &mut faults,
            ),
            min_price_movement: parse_or(
                "MIN_PRICE_MOVEMENT",
                defaults.min_price_movement,
                &mut faults,
            ),
            lookback_periods: parse_or(
                "LOOKBACK_PERIODS",
                defaults.lookback_periods,
                &mut faults,
            ),
        };

        if let Err(Error::Config(msg)) = engine.validate() {
            faults.push(msg);
        }

        let config = Config {
            api_key,
            client_id,
            client_secret,
            username,
            password,
            account_id,
            symbol: optional("SYMBOL").unwrap_or_else(|| "ES".to_string()),
            bar_size: optional("BAR_SIZE").unwrap_or_else(|| "1m".to_string()),
            trading_mode,
            paper_slippage_bps: parse_or("PAPER_SLIPPAGE_BPS", 10.0, &mut faults),
            state_path: optional("STATE_PATH").unwrap_or_else(|| "state/mrcbot.json".to_string()),
            engine,
        };

        if faults.is_empty() {
            Ok(config)
        } else {
            Err(Error::Config(faults.join("; ")))
        }
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T, faults: &mut Vec<String>) -> T {
    match optional(key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                faults.push(format!("{key} has invalid value '{raw}'"));
                default
            }
        },
        None => default,
    }
}
