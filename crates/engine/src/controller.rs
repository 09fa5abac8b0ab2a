//! One evaluation cycle over a bar window.
//!
//! The controller is the only place the filter, classifier, signal engine
//! and risk manager meet. It is a pure function of the supplied window and
//! the explicit `StrategyState`: no clock, no I/O, no hidden globals. The
//! caller owns the state and serializes calls against it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Action, Band, Bar, EngineConfig, Pattern, Result, Side, StrategyState};
use risk::RiskManager;
use strategy::{CandleClassifier, SignalEngine, SmootherFilter};

/// Per-cycle telemetry for logging and the caller's dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub band: Option<Band>,
    pub pattern: Pattern,
    pub reason: String,
}

/// The single decision of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub action: Action,
    pub diagnostics: Diagnostics,
}

impl StepOutcome {
    fn hold(band: Option<Band>, pattern: Pattern, reason: impl Into<String>) -> Self {
        Self {
            action: Action::Hold,
            diagnostics: Diagnostics { band, pattern, reason: reason.into() },
        }
    }
}

pub struct StrategyController {
    filter: SmootherFilter,
    classifier: CandleClassifier,
    signals: SignalEngine,
    risk: RiskManager,
}

impl StrategyController {
    /// Build a controller. Configuration is validated here, once; a bad
    /// configuration is fatal at startup, not tolerated per cycle.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: SmootherFilter::with_lookback(config.lookback_periods),
            classifier: CandleClassifier::default(),
            signals: SignalEngine::new(&config),
            risk: RiskManager::new(config),
        })
    }

    /// Evaluate one cycle: decide enter/exit/hold for the latest bar of
    /// `bars`, mutating only the caller-owned `state`. Linear in window
    /// length; never panics on well-typed input.
    pub fn step(&self, bars: &[Bar], state: &mut StrategyState) -> StepOutcome {
        let bands = self.filter.compute(bars);

        let Some(band) = bands.last().copied().flatten() else {
            return StepOutcome::hold(None, Pattern::None, "warming up");
        };
        // Window is non-empty past this point
        let current = bars.last().expect("bands imply bars");
        let previous = bars.len().checked_sub(2).and_then(|i| bars.get(i));
        let previous_band = bars
            .len()
            .checked_sub(2)
            .and_then(|i| bands.get(i))
            .copied()
            .flatten();

        let pattern = self.classifier.classify(previous, current);
        debug!(pattern = %pattern, close = current.close, "Cycle classified");

        if let Some(position) = state.position.clone() {
            return match self.risk.try_exit(&position, current) {
                Some(reason) => {
                    state.position = None;
                    StepOutcome {
                        action: Action::Exit,
                        diagnostics: Diagnostics {
                            band: Some(band),
                            pattern,
                            reason: reason.to_string(),
                        },
                    }
                }
                None => StepOutcome::hold(Some(band), pattern, "position open, no exit condition"),
            };
        }

        let signal = self
            .signals
            .evaluate(&band, previous_band.as_ref(), current, pattern);

        match self
            .risk
            .try_enter(&signal, current, state.position.as_ref(), &mut state.counter)
        {
            Ok(position) => {
                let action = match position.side {
                    Side::Long => Action::EnterLong,
                    Side::Short => Action::EnterShort,
                };
                state.position = Some(position);
                StepOutcome {
                    action,
                    diagnostics: Diagnostics { band: Some(band), pattern, reason: signal.reason },
                }
            }
            Err(rejection) => {
                // A NoSignal rejection carries less information than the
                // signal engine's own reason; prefer the specific one
                let reason = match rejection {
                    common::RejectionReason::NoSignal => signal.reason,
                    other => other.to_string(),
                };
                StepOutcome::hold(Some(band), pattern, reason)
            }
        }
    }
}
