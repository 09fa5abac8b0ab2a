//! Ehlers two-pole SuperSmoother with dynamic volatility bands.
//!
//! Recurrence: ss[t] = c1 * (close[t] + close[t-1]) / 2 + c2 * ss[t-1] + c3 * ss[t-2]
//! with c1 = 1 - c2 - c3, c2 = b1, c3 = -a1², a1 = exp(-√2·π/cutoff),
//! b1 = 2·a1·cos(√2·π/cutoff). Strictly causal: the value at index t depends
//! only on bars [0..t].
//!
//! Bands: center ± multiplier × population std-dev of the close-minus-center
//! residual over the last `lookback` bars. The first `lookback` bars are
//! warm-up and yield `None`.

use std::collections::VecDeque;
use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

use common::{Band, Bar};

/// Cutoff period of the low-pass recurrence, in bars. Standard SuperSmoother
/// setting for intraday charts.
pub const CUTOFF_PERIOD: usize = 20;

/// Band half-width in units of residual standard deviation.
pub const BAND_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct SmootherFilter {
    cutoff: usize,
    lookback: usize,
    multiplier: f64,
    // Recurrence coefficients, fixed for the life of the filter
    c1: f64,
    c2: f64,
    c3: f64,
}

/// Rolling filter state: two recurrence lags plus a bounded residual window
/// with running sums, so one update costs O(1) regardless of history length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterState {
    prev_close: f64,
    ss1: f64,
    ss2: f64,
    seen: usize,
    residuals: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl SmootherFilter {
    pub fn new(cutoff: usize, lookback: usize, multiplier: f64) -> Self {
        assert!(cutoff >= 2, "SuperSmoother cutoff must be >= 2");
        assert!(lookback >= 2, "band lookback must be >= 2");
        assert!(multiplier > 0.0, "band multiplier must be positive");

        let a1 = (-SQRT_2 * PI / cutoff as f64).exp();
        let b1 = 2.0 * a1 * (SQRT_2 * PI / cutoff as f64).cos();
        let c2 = b1;
        let c3 = -a1 * a1;
        let c1 = 1.0 - c2 - c3;

        Self { cutoff, lookback, multiplier, c1, c2, c3 }
    }

    /// Standard configuration for a given warm-up window.
    pub fn with_lookback(lookback: usize) -> Self {
        Self::new(CUTOFF_PERIOD, lookback, BAND_MULTIPLIER)
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    /// Push one bar into the rolling state. Returns the band for that bar,
    /// or `None` while still inside the warm-up window.
    pub fn update(&self, state: &mut FilterState, bar: &Bar) -> Option<Band> {
        let close = bar.close;

        let mut smoothed = if state.seen < 2 {
            // Seed the recurrence with raw closes
            close
        } else {
            self.c1 * (close + state.prev_close) / 2.0
                + self.c2 * state.ss1
                + self.c3 * state.ss2
        };
        if !smoothed.is_finite() {
            // A non-finite input poisoned the recurrence; restart from price
            smoothed = close;
        }

        state.ss2 = state.ss1;
        state.ss1 = smoothed;
        state.prev_close = close;
        state.seen += 1;

        let residual = close - smoothed;
        state.residuals.push_back(residual);
        state.sum += residual;
        state.sum_sq += residual * residual;
        if state.residuals.len() > self.lookback {
            if let Some(old) = state.residuals.pop_front() {
                state.sum -= old;
                state.sum_sq -= old * old;
            }
        }

        if state.seen <= self.lookback {
            return None;
        }

        let n = state.residuals.len() as f64;
        // Population variance; floating cancellation can drift slightly
        // negative, and a zero-variance window must collapse the bands
        let variance = ((state.sum_sq - state.sum * state.sum / n) / n).max(0.0);
        let mut deviation = variance.sqrt();
        if !deviation.is_finite() {
            deviation = 0.0;
        }

        Some(Band {
            center: smoothed,
            upper: smoothed + self.multiplier * deviation,
            lower: smoothed - self.multiplier * deviation,
        })
    }

    /// Compute bands for a whole window, one element per bar, aligned by
    /// index. A window shorter than the warm-up length yields all `None` —
    /// the caller's "insufficient data" indication. Pure: identical input
    /// always produces identical output.
    pub fn compute(&self, bars: &[Bar]) -> Vec<Option<Band>> {
        let mut state = FilterState::default();
        bars.iter().map(|bar| self.update(&mut state, bar)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_bars::from_closes;

    fn filter() -> SmootherFilter {
        SmootherFilter::new(10, 20, 2.0)
    }

    #[test]
    fn warmup_bars_are_not_ready() {
        let bars = from_closes(&vec![100.0; 25]);
        let bands = filter().compute(&bars);
        assert_eq!(bands.len(), 25);
        for band in &bands[..20] {
            assert!(band.is_none(), "warm-up bar should not be ready");
        }
        for band in &bands[20..] {
            assert!(band.is_some(), "post-warm-up bar should be ready");
        }
    }

    #[test]
    fn short_window_yields_no_ready_bands() {
        let bars = from_closes(&vec![100.0; 10]);
        let bands = filter().compute(&bars);
        assert!(bands.iter().all(|b| b.is_none()));
    }

    #[test]
    fn band_ordering_invariant_holds() {
        // A noisy but deterministic series
        let closes: Vec<f64> = (0..120)
            .map(|i| 4000.0 + (i as f64 * 0.7).sin() * 25.0 + i as f64 * 0.1)
            .collect();
        let bands = filter().compute(&from_closes(&closes));
        for band in bands.into_iter().flatten() {
            assert!(band.lower <= band.center, "lower > center");
            assert!(band.center <= band.upper, "center > upper");
        }
    }

    #[test]
    fn constant_series_collapses_bands_to_center() {
        let bars = from_closes(&vec![4250.25; 60]);
        let bands = filter().compute(&bars);
        let last = bands.last().unwrap().expect("band ready");
        assert!(last.center.is_finite());
        assert!((last.upper - last.center).abs() < 1e-9);
        assert!((last.lower - last.center).abs() < 1e-9);
        assert!((last.center - 4250.25).abs() < 1e-6);
    }

    #[test]
    fn output_is_deterministic() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 1.3).cos() * 5.0).collect();
        let bars = from_closes(&closes);
        let f = filter();
        assert_eq!(f.compute(&bars), f.compute(&bars));
    }

    #[test]
    fn incremental_update_matches_batch_compute() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + (i % 7) as f64).collect();
        let bars = from_closes(&closes);
        let f = filter();

        let batch = f.compute(&bars);
        let mut state = FilterState::default();
        let incremental: Vec<Option<Band>> =
            bars.iter().map(|b| f.update(&mut state, b)).collect();
        assert_eq!(batch, incremental);
    }

    #[test]
    fn smoothed_value_tracks_a_trend() {
        // On a steady uptrend the center must sit near the price, not lag
        // out to the window mean
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64 * 0.25).collect();
        let bands = filter().compute(&from_closes(&closes));
        let last = bands.last().unwrap().expect("band ready");
        let last_close = *closes.last().unwrap();
        assert!((last.center - last_close).abs() < 2.0, "center {} vs close {last_close}", last.center);
    }

    proptest::proptest! {
        #[test]
        fn bands_stay_finite_and_ordered(
            seed in 0.01f64..10_000.0,
            amplitude in 0.0f64..500.0,
        ) {
            let closes: Vec<f64> = (0..60)
                .map(|i| seed + amplitude * ((i as f64) * 0.9).sin())
                .collect();
            let bands = SmootherFilter::new(10, 20, 2.0).compute(&from_closes(&closes));
            for band in bands.into_iter().flatten() {
                proptest::prop_assert!(band.center.is_finite());
                proptest::prop_assert!(band.lower <= band.center && band.center <= band.upper);
            }
        }
    }
}
