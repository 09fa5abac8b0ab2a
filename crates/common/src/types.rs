use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One closed price bar, as returned by the market data collaborator.
/// Immutable once observed; the engine never mutates bar history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// High-to-low span of the bar. Zero for a flat bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Calendar trading date of the bar, derived from its own timestamp —
    /// never from the wall clock.
    pub fn trading_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Dynamic price envelope for one bar: smoothed center plus volatility bands.
/// `lower <= center <= upper` always holds; bars still warming up are
/// represented as `None`, never as a numeric placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Reversal candle shape recognized on the latest bar(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    None,
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
}

/// Directional bias carried by a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Pattern {
    pub fn bias(&self) -> Bias {
        match self {
            Pattern::Hammer | Pattern::BullishEngulfing => Bias::Bullish,
            Pattern::ShootingStar | Pattern::BearishEngulfing => Bias::Bearish,
            Pattern::None | Pattern::Doji => Bias::Neutral,
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pattern::None => "NONE",
            Pattern::Doji => "DOJI",
            Pattern::Hammer => "HAMMER",
            Pattern::ShootingStar => "SHOOTING_STAR",
            Pattern::BullishEngulfing => "BULLISH_ENGULFING",
            Pattern::BearishEngulfing => "BEARISH_ENGULFING",
        };
        write!(f, "{s}")
    }
}

/// Direction of an entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Long,
    Short,
    None,
}

/// Entry decision produced by the signal engine, recomputed every cycle.
/// The reason is carried into diagnostics regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub reason: String,
}

impl Signal {
    pub fn long(reason: impl Into<String>) -> Self {
        Self { kind: SignalKind::Long, reason: reason.into() }
    }

    pub fn short(reason: impl Into<String>) -> Self {
        Self { kind: SignalKind::Short, reason: reason.into() }
    }

    pub fn none(reason: impl Into<String>) -> Self {
        Self { kind: SignalKind::None, reason: reason.into() }
    }
}

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// An open futures position. At most one exists at any time (no pyramiding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    /// Contracts held; always the configured `max_position_size`.
    pub quantity: u32,
    pub entry_time: DateTime<Utc>,
    pub stop_price: f64,
    pub target_price: f64,
}

/// Entries completed per trading date. Reset when the date of the observed
/// bar rolls over; exits never touch the count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTradeCounter {
    pub trading_date: NaiveDate,
    pub count: u32,
}

impl DailyTradeCounter {
    pub fn new(trading_date: NaiveDate) -> Self {
        Self { trading_date, count: 0 }
    }

    /// Compare the bar's trading date against the stored one and reset the
    /// count on rollover. Deterministic: driven by bar timestamps only.
    pub fn observe(&mut self, trading_date: NaiveDate) {
        if trading_date != self.trading_date {
            self.trading_date = trading_date;
            self.count = 0;
        }
    }
}

/// All cross-cycle engine state, passed into and returned from every step.
/// Serializable so the caller can snapshot it between process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    pub position: Option<Position>,
    pub counter: DailyTradeCounter,
}

impl StrategyState {
    pub fn new(trading_date: NaiveDate) -> Self {
        Self {
            position: None,
            counter: DailyTradeCounter::new(trading_date),
        }
    }
}

/// The single action emitted per evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    EnterLong,
    EnterShort,
    Exit,
    Hold,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::EnterLong => "ENTER_LONG",
            Action::EnterShort => "ENTER_SHORT",
            Action::Exit => "EXIT",
            Action::Hold => "HOLD",
        };
        write!(f, "{s}")
    }
}

/// Reason an entry was rejected by the risk manager. Rejections are ordinary
/// outcomes surfaced as HOLD diagnostics, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    DailyTradeLimitReached,
    PositionAlreadyOpen,
    NoSignal,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::DailyTradeLimitReached => write!(f, "daily trade limit reached"),
            RejectionReason::PositionAlreadyOpen => write!(f, "position already open"),
            RejectionReason::NoSignal => write!(f, "no signal"),
        }
    }
}

/// Why an open position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Target,
    Stop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Target => write!(f, "target"),
            ExitReason::Stop => write!(f, "stop"),
        }
    }
}

/// Side of a broker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

/// An abstract order for the execution collaborator. The engine never builds
/// these itself — it emits an `Action` and the caller translates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    /// Last observed price, used by simulated fills.
    pub reference_price: f64,
}

impl OrderIntent {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u32,
        reference_price: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            reference_price,
        }
    }
}

/// Confirmation of a filled order returned by the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub fill_price: f64,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
}

/// Whether orders go to the real broker or are simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Market status reported by the data collaborator. The engine only runs
/// while the status is "Open".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatus {
    pub trading_status: String,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        self.trading_status.eq_ignore_ascii_case("open")
    }
}

/// Account snapshot used for startup logging only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub balance: f64,
}
