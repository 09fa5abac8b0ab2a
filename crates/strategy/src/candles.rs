//! Reversal candle recognition.
//!
//! Classifies the current bar (plus the previous one for engulfing shapes)
//! into one of the reversal patterns. Total function: every input yields a
//! label, zero-range bars classify as `Pattern::None`.
//!
//! When several shapes match, engulfing wins over hammer/shooting star,
//! which win over doji — engulfing needs two bars and is the strongest
//! reversal evidence.

use common::{Bar, Pattern};

/// Body no larger than this fraction of the range reads as a doji.
pub const DOJI_MAX_BODY_RATIO: f64 = 0.1;

/// Body no larger than this fraction of the range qualifies as "small" for
/// hammer / shooting star shapes.
pub const SMALL_BODY_MAX_RATIO: f64 = 0.3;

/// The dominant wick must be at least this multiple of the body.
pub const MIN_WICK_TO_BODY: f64 = 2.0;

/// The body must sit beyond this fraction of the range (from the far end)
/// for hammer (top of range) and shooting star (bottom of range).
pub const BODY_POSITION_RATIO: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct CandleClassifier {
    pub doji_max_body_ratio: f64,
    pub small_body_max_ratio: f64,
    pub min_wick_to_body: f64,
    pub body_position_ratio: f64,
}

impl Default for CandleClassifier {
    fn default() -> Self {
        Self {
            doji_max_body_ratio: DOJI_MAX_BODY_RATIO,
            small_body_max_ratio: SMALL_BODY_MAX_RATIO,
            min_wick_to_body: MIN_WICK_TO_BODY,
            body_position_ratio: BODY_POSITION_RATIO,
        }
    }
}

impl CandleClassifier {
    /// Classify the current bar, using the previous bar for two-bar shapes.
    pub fn classify(&self, previous: Option<&Bar>, current: &Bar) -> Pattern {
        let range = current.range();
        if range <= f64::EPSILON {
            return Pattern::None;
        }

        if let Some(prev) = previous {
            if let Some(pattern) = self.engulfing(prev, current) {
                return pattern;
            }
        }
        if self.is_hammer(current) {
            return Pattern::Hammer;
        }
        if self.is_shooting_star(current) {
            return Pattern::ShootingStar;
        }
        if body(current) <= self.doji_max_body_ratio * range {
            return Pattern::Doji;
        }
        Pattern::None
    }

    /// Current body of opposite color fully contains and exceeds the
    /// previous body.
    fn engulfing(&self, prev: &Bar, current: &Bar) -> Option<Pattern> {
        let contains = body_top(current) >= body_top(prev)
            && body_bottom(current) <= body_bottom(prev)
            && body(current) > body(prev);
        if !contains {
            return None;
        }

        let cur_bullish = current.close > current.open;
        let prev_bullish = prev.close > prev.open;
        let prev_bearish = prev.close < prev.open;

        if cur_bullish && prev_bearish {
            Some(Pattern::BullishEngulfing)
        } else if current.close < current.open && prev_bullish {
            Some(Pattern::BearishEngulfing)
        } else {
            None
        }
    }

    /// Small body in the upper part of the range with a long lower wick.
    fn is_hammer(&self, bar: &Bar) -> bool {
        let range = bar.range();
        let body = body(bar);
        body <= self.small_body_max_ratio * range
            && body_bottom(bar) >= bar.low + self.body_position_ratio * range
            && lower_wick(bar) >= self.min_wick_to_body * body
            && upper_wick(bar) <= body
    }

    /// Mirror of the hammer: small body near the low, long upper wick.
    fn is_shooting_star(&self, bar: &Bar) -> bool {
        let range = bar.range();
        let body = body(bar);
        body <= self.small_body_max_ratio * range
            && body_top(bar) <= bar.high - self.body_position_ratio * range
            && upper_wick(bar) >= self.min_wick_to_body * body
            && lower_wick(bar) <= body
    }
}

fn body(bar: &Bar) -> f64 {
    (bar.close - bar.open).abs()
}

fn body_top(bar: &Bar) -> f64 {
    bar.open.max(bar.close)
}

fn body_bottom(bar: &Bar) -> f64 {
    bar.open.min(bar.close)
}

fn upper_wick(bar: &Bar) -> f64 {
    bar.high - body_top(bar)
}

fn lower_wick(bar: &Bar) -> f64 {
    body_bottom(bar) - bar.low
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::Bias;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn classify(previous: Option<&Bar>, current: &Bar) -> Pattern {
        CandleClassifier::default().classify(previous, current)
    }

    #[test]
    fn hammer_small_body_top_of_range() {
        // Body = 1 point, range = 10 points, body in the top third
        let b = bar(8.5, 10.0, 0.0, 9.5);
        assert_eq!(classify(None, &b), Pattern::Hammer);
        assert_eq!(Pattern::Hammer.bias(), Bias::Bullish);
    }

    #[test]
    fn shooting_star_mirrors_hammer() {
        let b = bar(1.5, 10.0, 0.0, 0.5);
        assert_eq!(classify(None, &b), Pattern::ShootingStar);
        assert_eq!(Pattern::ShootingStar.bias(), Bias::Bearish);
    }

    #[test]
    fn doji_tiny_body_wide_range() {
        let b = bar(100.00, 101.00, 99.00, 100.02);
        assert_eq!(classify(None, &b), Pattern::Doji);
        assert_eq!(Pattern::Doji.bias(), Bias::Neutral);
    }

    #[test]
    fn bullish_engulfing_swallows_bearish_bar() {
        let prev = bar(102.0, 102.5, 100.5, 101.0); // bearish
        let cur = bar(100.5, 103.5, 100.0, 103.0); // bullish, contains prev body
        assert_eq!(classify(Some(&prev), &cur), Pattern::BullishEngulfing);
        assert_eq!(Pattern::BullishEngulfing.bias(), Bias::Bullish);
    }

    #[test]
    fn bearish_engulfing_swallows_bullish_bar() {
        let prev = bar(101.0, 102.5, 100.5, 102.0); // bullish
        let cur = bar(102.5, 103.0, 100.0, 100.5); // bearish, contains prev body
        assert_eq!(classify(Some(&prev), &cur), Pattern::BearishEngulfing);
    }

    #[test]
    fn engulfing_beats_single_bar_shapes() {
        // Current bar alone reads as a hammer: body 1.0 high in a range of
        // 10, long lower wick. With an engulfed bearish previous bar the
        // two-bar pattern must win.
        let prev = bar(9.3, 9.6, 8.6, 8.7); // bearish, body inside current's
        let cur = bar(8.5, 10.0, 0.0, 9.5);
        assert_eq!(classify(Some(&prev), &cur), Pattern::BullishEngulfing);
    }

    #[test]
    fn plain_trend_bar_is_no_pattern() {
        // Full-bodied bar, no meaningful wicks
        let b = bar(100.0, 105.2, 99.8, 105.0);
        assert_eq!(classify(None, &b), Pattern::None);
    }

    #[test]
    fn zero_range_bar_is_no_pattern() {
        let b = bar(100.0, 100.0, 100.0, 100.0);
        assert_eq!(classify(None, &b), Pattern::None);
    }

    #[test]
    fn equal_bodies_do_not_engulf() {
        let prev = bar(101.0, 101.5, 99.5, 100.0);
        let cur = bar(100.0, 101.5, 99.5, 101.0); // same body size, opposite color
        assert_ne!(classify(Some(&prev), &cur), Pattern::BullishEngulfing);
    }
}
