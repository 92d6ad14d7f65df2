//! Decision scorer
//!
//! Pure, deterministic, stateless: a small additive heuristic mapping
//! numeric signals to an action/risk/confidence triple. The thresholds
//! are load-bearing for output compatibility with existing reports, but
//! the function is a replaceable strategy, not a statistical model.

use tickflow_core::{Action, Decision, RiskLevel, StageData};

/// Numeric inputs to the scorer; zero means unknown
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionSignals {
    /// Percentage price change over the sampled window
    pub change_pct: f64,
    pub roe: f64,
    pub pe: f64,
    pub pb: f64,
}

impl DecisionSignals {
    /// Extract signals from the pipeline context, defaulting missing data
    /// to neutral zeros
    pub fn from_stage_data(data: &StageData) -> Self {
        let change_pct = data.quotes.as_ref().map_or(0.0, |w| w.change_pct());
        let fundamentals = data.fundamentals.unwrap_or_default();
        Self {
            change_pct,
            roe: fundamentals.roe,
            pe: fundamentals.pe,
            pb: fundamentals.pb,
        }
    }
}

/// Score a signal set into a decision
pub fn score(signals: &DecisionSignals) -> Decision {
    let mut score = 0i32;

    if signals.change_pct > 2.0 {
        score += 1;
    } else if signals.change_pct < -2.0 {
        score -= 1;
    }

    if signals.roe > 10.0 {
        score += 1;
    } else if signals.roe > 0.0 && signals.roe < 5.0 {
        score -= 1;
    }

    if signals.pe > 0.0 && signals.pe < 25.0 {
        score += 1;
    } else if signals.pe >= 40.0 {
        score -= 1;
    }

    if signals.pb > 0.0 && signals.pb < 3.0 {
        score += 1;
    } else if signals.pb >= 8.0 {
        score -= 1;
    }

    if score >= 2 {
        Decision {
            action: Action::BullishLeaning,
            risk: RiskLevel::Medium,
            confidence: 78,
        }
    } else if score <= -1 {
        Decision {
            action: Action::BearishLeaning,
            risk: RiskLevel::MediumHigh,
            confidence: 64,
        }
    } else {
        Decision {
            action: Action::HoldObserve,
            risk: RiskLevel::Medium,
            confidence: 70,
        }
    }
}
