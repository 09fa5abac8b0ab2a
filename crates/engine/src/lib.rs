pub mod controller;
pub mod tradovate;

pub use controller::{Diagnostics, StepOutcome, StrategyController};
pub use tradovate::TradovateClient;
