//! Market data and decision value types
//!
//! These are the payloads the pipeline carries between stages. All fields
//! tolerate absence: a zero or missing value means "unknown", never an
//! error, because market-data providers are unreliable collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Basic company identity returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    pub industry: String,
}

/// A single quote sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// One OHLCV candle in a chronological kline series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kline {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Fundamental ratios for a symbol; zero means unknown
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    pub roe: f64,
    pub pe: f64,
    pub pb: f64,
    pub revenue_growth: f64,
}

/// A window of recent quotes, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteWindow {
    pub quotes: Vec<Quote>,
}

impl QuoteWindow {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    /// Percentage price change across the window (newest vs oldest close)
    ///
    /// Returns 0.0 when the window is too short or the base close is
    /// non-positive, so the scorer sees a neutral signal.
    pub fn change_pct(&self) -> f64 {
        let (Some(newest), Some(oldest)) = (self.quotes.first(), self.quotes.last()) else {
            return 0.0;
        };
        if self.quotes.len() < 2 || oldest.close <= 0.0 {
            return 0.0;
        }
        (newest.close - oldest.close) / oldest.close * 100.0
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.quotes.first().map(|q| q.close)
    }
}

/// Qualitative action bias produced by the decision scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "bullish-leaning")]
    BullishLeaning,
    #[serde(rename = "bearish-leaning")]
    BearishLeaning,
    #[serde(rename = "hold/observe")]
    HoldObserve,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::BullishLeaning => "bullish-leaning",
            Action::BearishLeaning => "bearish-leaning",
            Action::HoldObserve => "hold/observe",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative risk level attached to a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "medium-high")]
    MediumHigh,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Medium => "medium",
            RiskLevel::MediumHigh => "medium-high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action/risk/confidence triple produced by the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub risk: RiskLevel,
    pub confidence: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(close: f64) -> Quote {
        Quote {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn test_change_pct_newest_first() {
        // newest 110, oldest 100 -> +10%
        let window = QuoteWindow::new(vec![quote(110.0), quote(105.0), quote(100.0)]);
        assert!((window.change_pct() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_change_pct_degenerate_windows() {
        assert_eq!(QuoteWindow::new(vec![]).change_pct(), 0.0);
        assert_eq!(QuoteWindow::new(vec![quote(100.0)]).change_pct(), 0.0);
        assert_eq!(
            QuoteWindow::new(vec![quote(100.0), quote(0.0)]).change_pct(),
            0.0
        );
    }

    #[test]
    fn test_action_wire_format() {
        assert_eq!(
            serde_json::to_string(&Action::BullishLeaning).unwrap(),
            "\"bullish-leaning\""
        );
        assert_eq!(
            serde_json::to_string(&Action::HoldObserve).unwrap(),
            "\"hold/observe\""
        );
        assert_eq!(
            serde_json::to_string(&RiskLevel::MediumHigh).unwrap(),
            "\"medium-high\""
        );
    }
}
