pub mod candles;
pub mod indicators;
pub mod signal;

pub use candles::CandleClassifier;
pub use indicators::supersmoother::{FilterState, SmootherFilter};
pub use signal::SignalEngine;

#[cfg(test)]
pub(crate) mod test_bars {
    use chrono::{Duration, TimeZone, Utc};
    use common::Bar;

    /// Build bars from close prices, one minute apart, with a small
    /// symmetric high/low envelope.
    pub fn from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::minutes(i as i64),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 100.0,
            })
            .collect()
    }
}
