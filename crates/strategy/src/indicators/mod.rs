pub mod supersmoother;

pub use supersmoother::{FilterState, SmootherFilter};
