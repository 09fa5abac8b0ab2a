//! Simulated execution for paper trading.
//!
//! Fills are simulated at the intent's reference price with configurable
//! slippage. No real orders are ever sent to the broker. The in-memory fill
//! ledger lets the run loop audit what the bot "traded".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ExecutionClient, Fill, OrderIntent, OrderSide, Result};

pub struct PaperBroker {
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
    /// Every simulated fill, oldest first.
    fills: Arc<RwLock<Vec<Fill>>>,
}

impl PaperBroker {
    pub fn new(slippage_bps: f64) -> Self {
        info!(slippage_bps, "PaperBroker initialized");
        Self {
            slippage_bps,
            fills: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All fills recorded so far (for auditing and tests).
    pub async fn fills(&self) -> Vec<Fill> {
        self.fills.read().await.clone()
    }
}

#[async_trait]
impl ExecutionClient for PaperBroker {
    async fn place_order(&self, intent: &OrderIntent) -> Result<Fill> {
        if intent.reference_price <= 0.0 {
            return Err(Error::Broker(format!(
                "paper fill needs a positive reference price, got {}",
                intent.reference_price
            )));
        }

        // Buys pay more, sells receive less
        let fill_price = match intent.side {
            OrderSide::Buy => intent.reference_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => intent.reference_price * (1.0 - self.slippage_bps / 10_000.0),
        };

        debug!(
            symbol = %intent.symbol,
            side = %intent.side,
            reference = intent.reference_price,
            fill = fill_price,
            qty = intent.quantity,
            "Paper fill simulated"
        );

        let fill = Fill {
            order_id: intent.id.clone(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            fill_price,
            quantity: intent.quantity,
            timestamp: Utc::now(),
        };

        self.fills.write().await.push(fill.clone());
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buy_fill_applies_positive_slippage() {
        let broker = PaperBroker::new(10.0); // 10 bps
        let intent = OrderIntent::market("ESM4", OrderSide::Buy, 1, 5000.0);

        let fill = broker.place_order(&intent).await.unwrap();

        let expected = 5000.0 * (1.0 + 10.0 / 10_000.0);
        assert!(
            (fill.fill_price - expected).abs() < 1e-6,
            "Buy fill price {}, expected {expected}",
            fill.fill_price
        );
    }

    #[tokio::test]
    async fn sell_fill_applies_negative_slippage() {
        let broker = PaperBroker::new(10.0);
        let intent = OrderIntent::market("ESM4", OrderSide::Sell, 1, 5000.0);

        let fill = broker.place_order(&intent).await.unwrap();

        let expected = 5000.0 * (1.0 - 10.0 / 10_000.0);
        assert!(
            (fill.fill_price - expected).abs() < 1e-6,
            "Sell fill price {}, expected {expected}",
            fill.fill_price
        );
    }

    #[tokio::test]
    async fn fills_are_recorded_in_order() {
        let broker = PaperBroker::new(0.0);
        broker
            .place_order(&OrderIntent::market("ESM4", OrderSide::Buy, 1, 5000.0))
            .await
            .unwrap();
        broker
            .place_order(&OrderIntent::market("ESM4", OrderSide::Sell, 1, 5010.0))
            .await
            .unwrap();

        let fills = broker.fills().await;
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].side, OrderSide::Buy);
        assert_eq!(fills[1].side, OrderSide::Sell);
    }

    #[tokio::test]
    async fn missing_reference_price_is_rejected() {
        let broker = PaperBroker::new(0.0);
        let intent = OrderIntent::market("ESM4", OrderSide::Buy, 1, 0.0);
        assert!(broker.place_order(&intent).await.is_err());
    }
}
