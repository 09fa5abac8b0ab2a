//! REST client for the Tradovate API.
//!
//! External collaborator: the engine never touches this. Handles access-token
//! authentication, historical chart bars, market status and order placement.
//! This is the ONLY component in the workspace that talks HTTP.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    AccountSummary, Bar, Config, Error, ExecutionClient, Fill, MarketDataClient, MarketStatus,
    OrderIntent, Result, TradingMode,
};

const LIVE_BASE_URL: &str = "https://live.tradovateapi.com/v1";
const DEMO_BASE_URL: &str = "https://demo.tradovateapi.com/v1";

const APP_ID: &str = "mrcbot";
const APP_VERSION: &str = "0.1.0";

pub struct TradovateClient {
    base_url: String,
    credentials: Credentials,
    account_id: String,
    http: Client,
    /// Access token obtained by `authenticate`, refreshed on demand.
    access_token: RwLock<Option<String>>,
}

#[derive(Debug, Clone)]
struct Credentials {
    api_key: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

impl TradovateClient {
    /// Build a client from process configuration. Paper mode talks to the
    /// demo environment so paper data matches paper fills.
    pub fn new(config: &Config) -> Self {
        let base_url = match config.trading_mode {
            TradingMode::Live => LIVE_BASE_URL.to_string(),
            TradingMode::Paper => DEMO_BASE_URL.to_string(),
        };
        Self {
            base_url,
            credentials: Credentials {
                api_key: config.api_key.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
            },
            account_id: config.account_id.clone(),
            http: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("Failed to build HTTP client"),
            access_token: RwLock::new(None),
        }
    }

    /// Request an access token and cache it for subsequent calls.
    pub async fn authenticate(&self) -> Result<()> {
        let url = format!("{}/auth/accesstokenrequest", self.base_url);
        let body = AccessTokenRequest {
            name: &self.credentials.username,
            password: &self.credentials.password,
            app_id: APP_ID,
            app_version: APP_VERSION,
            cid: &self.credentials.client_id,
            sec: &self.credentials.client_secret,
            device_id: &self.credentials.api_key,
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Auth(format!("HTTP {status}: {text}")));
        }

        let token: AccessTokenResponse =
            serde_json::from_str(&text).map_err(|e| Error::Auth(e.to_string()))?;
        if let Some(reason) = token.error_text {
            return Err(Error::Auth(reason));
        }

        *self.access_token.write().await = Some(token.access_token);
        info!("Tradovate access token acquired");
        Ok(())
    }

    async fn bearer(&self) -> Result<String> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Auth("not authenticated — call authenticate() first".into()))
    }

    async fn authed_get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let token = self.bearer().await?;
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Broker(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn authed_post<B: Serialize>(&self, path: &str, body: &B) -> Result<String> {
        let token = self.bearer().await?;
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(body)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Broker(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

#[async_trait]
impl MarketDataClient for TradovateClient {
    async fn historical_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("startTime", start.to_rfc3339()),
            ("endTime", end.to_rfc3339()),
        ];
        let body = self.authed_get("/md/bars", &query).await?;

        let chart: ChartResponse =
            serde_json::from_str(&body).map_err(|e| Error::Broker(e.to_string()))?;

        let mut bars: Vec<Bar> = chart
            .bars
            .into_iter()
            .map(|b| Bar {
                timestamp: Utc
                    .timestamp_millis_opt(b.timestamp)
                    .single()
                    .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap()),
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                volume: b.volume,
            })
            .collect();
        bars.sort_by_key(|b| b.timestamp);

        debug!(symbol, count = bars.len(), "Fetched historical bars");
        Ok(bars)
    }

    async fn market_status(&self, symbol: &str) -> Result<MarketStatus> {
        let query = [("symbol", symbol.to_string())];
        let body = self.authed_get("/md/marketstatus", &query).await?;

        let status: MarketStatusResponse =
            serde_json::from_str(&body).map_err(|e| Error::Broker(e.to_string()))?;
        Ok(MarketStatus { trading_status: status.trading_status })
    }

    async fn account_summary(&self) -> Result<AccountSummary> {
        let body = self
            .authed_post(
                "/cashBalance/getcashbalancesnapshot",
                &CashBalanceRequest { account_id: &self.account_id },
            )
            .await?;

        let snapshot: CashBalanceResponse =
            serde_json::from_str(&body).map_err(|e| Error::Broker(e.to_string()))?;
        Ok(AccountSummary {
            account_id: self.account_id.clone(),
            balance: snapshot.total_cash_value,
        })
    }
}

#[async_trait]
impl ExecutionClient for TradovateClient {
    async fn place_order(&self, intent: &OrderIntent) -> Result<Fill> {
        let body = PlaceOrderRequest {
            account_id: &self.account_id,
            symbol: &intent.symbol,
            action: intent.side.to_string(),
            order_qty: intent.quantity,
            order_type: "Market",
            is_automated: true,
        };

        debug!(symbol = %intent.symbol, side = %intent.side, "Submitting order to Tradovate");
        let text = self.authed_post("/order/placeorder", &body).await?;

        let resp: PlaceOrderResponse =
            serde_json::from_str(&text).map_err(|e| Error::Broker(e.to_string()))?;
        if let Some(reason) = resp.failure_text {
            return Err(Error::Broker(reason));
        }

        // Market orders fill near the latest close; the actual fill report
        // arrives asynchronously, so the intent's reference price stands in
        Ok(Fill {
            order_id: resp.order_id.to_string(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            fill_price: intent.reference_price,
            quantity: intent.quantity,
            timestamp: Utc::now(),
        })
    }
}

// ─── Request / response types ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest<'a> {
    name: &'a str,
    password: &'a str,
    app_id: &'a str,
    app_version: &'a str,
    cid: &'a str,
    sec: &'a str,
    device_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    error_text: Option<String>,
}

#[derive(Deserialize)]
struct ChartResponse {
    #[serde(default)]
    bars: Vec<ChartBar>,
}

#[derive(Deserialize)]
struct ChartBar {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketStatusResponse {
    trading_status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CashBalanceRequest<'a> {
    account_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CashBalanceResponse {
    total_cash_value: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderRequest<'a> {
    account_id: &'a str,
    symbol: &'a str,
    action: String,
    order_qty: u32,
    order_type: &'a str,
    is_automated: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderResponse {
    #[serde(default)]
    order_id: i64,
    #[serde(default)]
    failure_text: Option<String>,
}
