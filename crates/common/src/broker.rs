use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AccountSummary, Bar, Fill, MarketStatus, OrderIntent, Result};

/// Read side of the broker connection: bar history, market status, account.
///
/// `TradovateClient` in `crates/engine` implements this for the real API;
/// paper mode still reads real market data through it.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetch closed bars for `symbol` at `interval`, ordered oldest first.
    /// An empty result means "no data"; callers must not invoke the engine
    /// on an empty window.
    async fn historical_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    async fn market_status(&self, symbol: &str) -> Result<MarketStatus>;

    async fn account_summary(&self) -> Result<AccountSummary>;
}

/// Write side of the broker connection.
///
/// The engine never calls this — it emits an `Action` and the caller in
/// `bin/mrcbot` translates it into an `OrderIntent` and reports the fill
/// back into engine state on the next cycle.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn place_order(&self, intent: &OrderIntent) -> Result<Fill>;
}
