//! Entry signal fusion: band breach direction × pattern bias.
//!
//! Mean-reversion rule: a lower-band breach with a bullish reversal pattern
//! goes LONG, an upper-band breach with a bearish pattern goes SHORT. A
//! pattern alone never triggers; neither does a breach without the opposing
//! pattern.

use tracing::debug;

use common::{Band, Bar, Bias, EngineConfig, Pattern, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Breach {
    Lower,
    Upper,
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    min_price_movement: f64,
}

impl SignalEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self { min_price_movement: config.min_price_movement }
    }

    /// Evaluate one bar against the current band. `previous_band` guards
    /// against acting on the very first band out of warm-up, where a breach
    /// may be an artifact of the band just forming.
    pub fn evaluate(
        &self,
        band: &Band,
        previous_band: Option<&Band>,
        bar: &Bar,
        pattern: Pattern,
    ) -> Signal {
        let lower_breached = bar.low <= band.lower;
        let upper_breached = bar.high >= band.upper;

        let breach = match (lower_breached, upper_breached) {
            (false, false) => return Signal::none("no band breach"),
            (true, false) => Breach::Lower,
            (false, true) => Breach::Upper,
            // Both bands inside one unusually wide bar: take the side the
            // price settled toward
            (true, true) => {
                if (bar.close - band.lower).abs() <= (band.upper - bar.close).abs() {
                    Breach::Lower
                } else {
                    Breach::Upper
                }
            }
        };

        if previous_band.is_none() {
            return Signal::none("band just formed");
        }

        let signal = match (breach, pattern.bias()) {
            (Breach::Lower, Bias::Bullish) => {
                if bar.range() < self.min_price_movement {
                    Signal::none("below minimum movement")
                } else {
                    Signal::long(format!("lower band breach with {pattern} reversal"))
                }
            }
            (Breach::Upper, Bias::Bearish) => {
                if bar.range() < self.min_price_movement {
                    Signal::none("below minimum movement")
                } else {
                    Signal::short(format!("upper band breach with {pattern} reversal"))
                }
            }
            (Breach::Lower, _) => Signal::none("lower band breach without bullish reversal"),
            (Breach::Upper, _) => Signal::none("upper band breach without bearish reversal"),
        };

        debug!(
            kind = ?signal.kind,
            reason = %signal.reason,
            close = bar.close,
            lower = band.lower,
            upper = band.upper,
            "Signal evaluated"
        );
        signal
    }
}
