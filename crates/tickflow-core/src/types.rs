//! Request parameter types shared across the workspace

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market a symbol trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// Mainland China A-shares
    Domestic,
    /// Hong Kong exchange
    #[serde(rename = "hk")]
    HongKong,
    /// US exchanges
    Us,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Domestic => "domestic",
            Market::HongKong => "hk",
            Market::Us => "us",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" | "cn" | "a" | "a-share" => Ok(Market::Domestic),
            "hk" | "hongkong" | "hong-kong" => Ok(Market::HongKong),
            "us" | "usa" => Ok(Market::Us),
            other => Err(Error::InvalidArgument(format!("unknown market: {other}"))),
        }
    }
}

/// Analysis thoroughness tier
///
/// The tick pipeline always runs at [`AnalysisDepth::Deep`]; the lighter
/// tiers exist for the dashboard's one-shot lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Quick,
    Standard,
    Deep,
}

impl Default for AnalysisDepth {
    fn default() -> Self {
        Self::Deep
    }
}

/// Case-normalize a ticker symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
