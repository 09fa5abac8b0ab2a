//! Position and risk state machine: FLAT → OPEN → FLAT.
//!
//! The gatekeeper between the signal engine and any order flow. Entries are
//! gated on the daily trade cap and the single-position rule; exits fire on
//! fixed percentage target/stop levels. Rejections are typed outcomes, never
//! errors.

use tracing::{info, warn};

use common::{
    Bar, DailyTradeCounter, EngineConfig, ExitReason, Position, RejectionReason, Side, Signal,
    SignalKind,
};

pub struct RiskManager {
    config: EngineConfig,
}

impl RiskManager {
    /// `config` is assumed already validated (`profit_target_pct >
    /// stop_loss_pct > 0` is enforced at construction time by the caller).
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Attempt to open a position on `signal` at the close of `bar`.
    ///
    /// The counter observes the bar's trading date first, so a date rollover
    /// resets the count before the cap is checked. It increments only when
    /// the entry succeeds.
    pub fn try_enter(
        &self,
        signal: &Signal,
        bar: &Bar,
        position: Option<&Position>,
        counter: &mut DailyTradeCounter,
    ) -> Result<Position, RejectionReason> {
        counter.observe(bar.trading_date());

        let side = match signal.kind {
            SignalKind::Long => Side::Long,
            SignalKind::Short => Side::Short,
            SignalKind::None => return Err(RejectionReason::NoSignal),
        };

        if position.is_some() {
            warn!(side = %side, "Entry rejected: position already open");
            return Err(RejectionReason::PositionAlreadyOpen);
        }

        if counter.count >= self.config.max_daily_trades {
            warn!(
                count = counter.count,
                cap = self.config.max_daily_trades,
                "Entry rejected: daily trade limit reached"
            );
            return Err(RejectionReason::DailyTradeLimitReached);
        }

        let entry_price = bar.close;
        let (stop_price, target_price) = match side {
            Side::Long => (
                entry_price * (1.0 - self.config.stop_loss_pct),
                entry_price * (1.0 + self.config.profit_target_pct),
            ),
            Side::Short => (
                entry_price * (1.0 + self.config.stop_loss_pct),
                entry_price * (1.0 - self.config.profit_target_pct),
            ),
        };

        counter.count += 1;
        info!(
            side = %side,
            entry = entry_price,
            stop = stop_price,
            target = target_price,
            daily_count = counter.count,
            "Entry approved"
        );

        Ok(Position {
            side,
            entry_price,
            quantity: self.config.max_position_size,
            entry_time: bar.timestamp,
            stop_price,
            target_price,
        })
    }

    /// Check the open position against `bar` for a target or stop exit.
    ///
    /// When both levels fall inside the same bar the stop wins: with no
    /// intrabar path information the worst case is assumed. Exits never
    /// touch the daily counter.
    pub fn try_exit(&self, position: &Position, bar: &Bar) -> Option<ExitReason> {
        let (stop_hit, target_hit) = match position.side {
            Side::Long => (
                bar.low <= position.stop_price,
                bar.high >= position.target_price,
            ),
            Side::Short => (
                bar.high >= position.stop_price,
                bar.low <= position.target_price,
            ),
        };

        let reason = if stop_hit {
            ExitReason::Stop
        } else if target_hit {
            ExitReason::Target
        } else {
            return None;
        };

        info!(
            side = %position.side,
            entry = position.entry_price,
            reason = %reason,
            "Exit triggered"
        );
        Some(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn bar_at(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 50.0,
        }
    }

    fn counter() -> DailyTradeCounter {
        DailyTradeCounter::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap().date_naive(),
        )
    }

    #[test]
    fn long_entry_sets_target_and_stop_levels() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let entry_bar = bar_at(4, 5005.0, 4995.0, 5000.0);

        let position = manager
            .try_enter(&Signal::long("test"), &entry_bar, None, &mut counter)
            .expect("entry approved");

        assert_eq!(position.side, Side::Long);
        assert_eq!(position.quantity, 1);
        assert!((position.target_price - 5100.0).abs() < 1e-9);
        assert!((position.stop_price - 4950.0).abs() < 1e-9);
        assert_eq!(counter.count, 1);
    }

    #[test]
    fn short_entry_mirrors_the_levels() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let entry_bar = bar_at(4, 5005.0, 4995.0, 5000.0);

        let position = manager
            .try_enter(&Signal::short("test"), &entry_bar, None, &mut counter)
            .expect("entry approved");

        assert!((position.target_price - 4900.0).abs() < 1e-9);
        assert!((position.stop_price - 5050.0).abs() < 1e-9);
    }

    #[test]
    fn long_target_hit_exits_with_target_reason() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let position = manager
            .try_enter(&Signal::long("test"), &bar_at(4, 5001.0, 4999.0, 5000.0), None, &mut counter)
            .unwrap();

        // High 5110 reaches the 5100 target; low stays above the 4950 stop
        let exit = manager.try_exit(&position, &bar_at(4, 5110.0, 5060.0, 5100.0));
        assert_eq!(exit, Some(ExitReason::Target));
    }

    #[test]
    fn stop_takes_priority_when_both_levels_hit() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let position = manager
            .try_enter(&Signal::long("test"), &bar_at(4, 5001.0, 4999.0, 5000.0), None, &mut counter)
            .unwrap();

        // Low 4900 breaches the stop AND high 5150 breaches the target
        let exit = manager.try_exit(&position, &bar_at(4, 5150.0, 4900.0, 5000.0));
        assert_eq!(exit, Some(ExitReason::Stop));
    }

    #[test]
    fn short_exit_levels_are_mirrored() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let position = manager
            .try_enter(&Signal::short("test"), &bar_at(4, 5001.0, 4999.0, 5000.0), None, &mut counter)
            .unwrap();

        // Target 4900 hit from above
        let exit = manager.try_exit(&position, &bar_at(4, 4960.0, 4890.0, 4910.0));
        assert_eq!(exit, Some(ExitReason::Target));

        // Stop 5050 hit, and stop beats a simultaneous target
        let exit = manager.try_exit(&position, &bar_at(4, 5060.0, 4890.0, 5000.0));
        assert_eq!(exit, Some(ExitReason::Stop));
    }

    #[test]
    fn no_exit_inside_the_levels() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let position = manager
            .try_enter(&Signal::long("test"), &bar_at(4, 5001.0, 4999.0, 5000.0), None, &mut counter)
            .unwrap();

        assert_eq!(manager.try_exit(&position, &bar_at(4, 5050.0, 4980.0, 5020.0)), None);
    }

    #[test]
    fn entry_rejected_while_position_open() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let entry_bar = bar_at(4, 5001.0, 4999.0, 5000.0);
        let open = manager
            .try_enter(&Signal::long("test"), &entry_bar, None, &mut counter)
            .unwrap();

        let rejected =
            manager.try_enter(&Signal::long("test"), &entry_bar, Some(&open), &mut counter);
        assert_eq!(rejected, Err(RejectionReason::PositionAlreadyOpen));
        assert_eq!(counter.count, 1, "rejection must not increment the counter");
    }

    #[test]
    fn daily_cap_rejects_and_resets_on_date_rollover() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let entry_bar = bar_at(4, 5001.0, 4999.0, 5000.0);

        for _ in 0..5 {
            manager
                .try_enter(&Signal::long("test"), &entry_bar, None, &mut counter)
                .unwrap();
        }
        assert_eq!(counter.count, 5);
        assert_eq!(
            manager.try_enter(&Signal::long("test"), &entry_bar, None, &mut counter),
            Err(RejectionReason::DailyTradeLimitReached)
        );

        // Next trading date: counter resets, entry allowed again
        let next_day = bar_at(5, 5001.0, 4999.0, 5000.0);
        assert!(manager
            .try_enter(&Signal::long("test"), &next_day, None, &mut counter)
            .is_ok());
        assert_eq!(counter.count, 1);
    }

    #[test]
    fn no_signal_is_rejected_without_counting() {
        let manager = RiskManager::new(config());
        let mut counter = counter();
        let rejected = manager.try_enter(
            &Signal::none("no band breach"),
            &bar_at(4, 5001.0, 4999.0, 5000.0),
            None,
            &mut counter,
        );
        assert_eq!(rejected, Err(RejectionReason::NoSignal));
        assert_eq!(counter.count, 0);
    }
}
