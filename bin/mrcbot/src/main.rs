use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{
    Action, Bar, Config, ExecutionClient, MarketDataClient, OrderIntent, OrderSide, Side,
    StrategyState, TradingMode,
};
use engine::{StrategyController, TradovateClient};
use paper::PaperBroker;

/// Seconds between evaluation cycles (one-minute bars).
const POLL_INTERVAL_SECS: u64 = 60;

/// Hours of history fetched for each evaluation window.
const LOOKBACK_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("configuration error")?;
    info!(mode = %cfg.trading_mode, symbol = %cfg.symbol, "MRC SuperSmoother bot starting");

    let controller =
        StrategyController::new(cfg.engine.clone()).context("invalid engine configuration")?;

    // ── Broker clients ────────────────────────────────────────────────────────
    let broker = Arc::new(TradovateClient::new(&cfg));
    broker.authenticate().await.context("authentication error")?;

    match broker.account_summary().await {
        Ok(account) => info!(balance = account.balance, "Account balance"),
        Err(e) => warn!("Could not get account info: {e}"),
    }

    let executor: Arc<dyn ExecutionClient> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode — orders go to Tradovate");
            broker.clone()
        }
        TradingMode::Paper => {
            info!(slippage_bps = cfg.paper_slippage_bps, "Paper trading mode — orders simulated");
            Arc::new(PaperBroker::new(cfg.paper_slippage_bps))
        }
    };

    // ── Run ───────────────────────────────────────────────────────────────────
    let test_mode = std::env::args().nth(1).as_deref() == Some("test");
    if test_mode {
        return run_test(broker.as_ref(), &controller, &cfg).await;
    }

    tokio::select! {
        result = run_loop(broker.as_ref(), executor.as_ref(), &controller, &cfg) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
            Ok(())
        }
    }
}

/// Main trading loop: gate on market status, fetch bars, evaluate one cycle,
/// execute the resulting action, snapshot state.
async fn run_loop(
    data: &dyn MarketDataClient,
    executor: &dyn ExecutionClient,
    controller: &StrategyController,
    cfg: &Config,
) -> anyhow::Result<()> {
    let mut state = load_state(&cfg.state_path);

    loop {
        match data.market_status(&cfg.symbol).await {
            Ok(status) if status.is_open() => {}
            Ok(_) => {
                info!("Market is closed. Waiting...");
                sleep_cycle().await;
                continue;
            }
            Err(e) => {
                warn!("Failed to fetch market status: {e}");
                sleep_cycle().await;
                continue;
            }
        }

        let bars = match fetch_window(data, cfg).await {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                warn!("No data available, waiting...");
                sleep_cycle().await;
                continue;
            }
            Err(e) => {
                warn!("Failed to fetch market data: {e}");
                sleep_cycle().await;
                continue;
            }
        };
        info!(count = bars.len(), interval = %cfg.bar_size, "Fetched bars");

        // Keep a copy so a failed order can roll the engine state back to
        // match reality
        let before = state.clone();
        let outcome = controller.step(&bars, &mut state);
        info!(
            action = %outcome.action,
            pattern = %outcome.diagnostics.pattern,
            reason = %outcome.diagnostics.reason,
            "Cycle evaluated"
        );

        if let Some(intent) = order_for(&outcome.action, &before, &state, &bars, cfg) {
            match executor.place_order(&intent).await {
                Ok(fill) => {
                    info!(
                        symbol = %fill.symbol,
                        side = %fill.side,
                        price = fill.fill_price,
                        qty = fill.quantity,
                        "Order filled"
                    );
                }
                Err(e) => {
                    error!("Order submission failed, reverting engine state: {e}");
                    state = before;
                }
            }
        }

        if let Err(e) = save_state(&cfg.state_path, &state) {
            warn!("Failed to persist strategy state: {e}");
        }

        sleep_cycle().await;
    }
}

/// Replay the strategy over fetched history and report what it would have
/// done, without placing any orders.
async fn run_test(
    data: &dyn MarketDataClient,
    controller: &StrategyController,
    cfg: &Config,
) -> anyhow::Result<()> {
    info!("Testing MRC SuperSmoother strategy on historical data");

    let bars = fetch_window(data, cfg).await.context("failed to fetch test data")?;
    let window_len = cfg.engine.lookback_periods + 10;
    if bars.len() <= window_len {
        anyhow::bail!(
            "not enough history for a test run: got {} bars, need more than {window_len}",
            bars.len()
        );
    }

    let mut state = StrategyState::new(bars[0].trading_date());
    let mut entries_long = 0u32;
    let mut entries_short = 0u32;
    let mut exits = 0u32;

    for i in window_len..=bars.len() {
        let window = &bars[i - window_len..i];
        let outcome = controller.step(window, &mut state);
        match outcome.action {
            Action::EnterLong => entries_long += 1,
            Action::EnterShort => entries_short += 1,
            Action::Exit => exits += 1,
            Action::Hold => {}
        }
    }

    info!(
        cycles = bars.len() - window_len + 1,
        long_entries = entries_long,
        short_entries = entries_short,
        exits,
        "Test completed"
    );
    Ok(())
}

async fn fetch_window(data: &dyn MarketDataClient, cfg: &Config) -> common::Result<Vec<Bar>> {
    let end = Utc::now();
    let start = end - chrono::Duration::hours(LOOKBACK_HOURS);
    data.historical_bars(&cfg.symbol, &cfg.bar_size, start, end).await
}

/// Translate the engine's action into an order, if any. EXIT closes the side
/// that was open before the step cleared it.
fn order_for(
    action: &Action,
    before: &StrategyState,
    after: &StrategyState,
    bars: &[Bar],
    cfg: &Config,
) -> Option<OrderIntent> {
    let reference_price = bars.last().map(|b| b.close)?;
    match action {
        Action::EnterLong => {
            let position = after.position.as_ref()?;
            Some(OrderIntent::market(&cfg.symbol, OrderSide::Buy, position.quantity, reference_price))
        }
        Action::EnterShort => {
            let position = after.position.as_ref()?;
            Some(OrderIntent::market(&cfg.symbol, OrderSide::Sell, position.quantity, reference_price))
        }
        Action::Exit => {
            let position = before.position.as_ref()?;
            let side = match position.side {
                Side::Long => OrderSide::Sell,
                Side::Short => OrderSide::Buy,
            };
            Some(OrderIntent::market(&cfg.symbol, side, position.quantity, reference_price))
        }
        Action::Hold => None,
    }
}

fn load_state(path: &str) -> StrategyState {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(state) => {
                info!(path, "Restored strategy state");
                state
            }
            Err(e) => {
                warn!(path, "State snapshot unreadable ({e}), starting flat");
                StrategyState::new(Utc::now().date_naive())
            }
        },
        Err(_) => {
            info!(path, "No state snapshot found, starting flat");
            StrategyState::new(Utc::now().date_naive())
        }
    }
}

fn save_state(path: &str, state: &StrategyState) -> common::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

async fn sleep_cycle() {
    tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
}
