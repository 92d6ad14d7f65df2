//! Deterministic in-memory gateway for offline runs and tests

use crate::error::Result;
use crate::gateway::MarketDataGateway;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tickflow_core::{BasicInfo, Fundamentals, Kline, Quote};

/// Canned market data for one symbol
#[derive(Debug, Clone, Default)]
pub struct SymbolData {
    pub basic: Option<BasicInfo>,
    /// Newest first, as the gateway contract requires
    pub quotes: Vec<Quote>,
    pub fundamentals: Option<Fundamentals>,
    /// Chronological
    pub klines: Vec<Kline>,
}

impl SymbolData {
    /// Generate a smooth synthetic price series with a fixed daily drift
    ///
    /// `daily_drift_pct` of +1.0 compounds the close by 1% per sample, so a
    /// positive drift yields a bullish quote window and vice versa.
    pub fn synthetic(
        name: impl Into<String>,
        industry: impl Into<String>,
        start_close: f64,
        daily_drift_pct: f64,
        samples: usize,
        fundamentals: Fundamentals,
    ) -> Self {
        let now = Utc::now();
        let mut close = start_close;
        let mut klines = Vec::with_capacity(samples);
        for i in 0..samples {
            let timestamp = now - Duration::days((samples - i) as i64);
            klines.push(Kline {
                timestamp,
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000,
            });
            close *= 1.0 + daily_drift_pct / 100.0;
        }

        let quotes = klines
            .iter()
            .rev()
            .map(|k| Quote {
                timestamp: k.timestamp,
                open: k.open,
                high: k.high,
                low: k.low,
                close: k.close,
                volume: k.volume,
            })
            .collect();

        Self {
            basic: Some(BasicInfo {
                name: name.into(),
                industry: industry.into(),
            }),
            quotes,
            fundamentals: Some(fundamentals),
            klines,
        }
    }
}

/// Gateway serving only preloaded data
///
/// Symbols it does not know about answer "no data" on every endpoint,
/// which makes an empty `StaticGateway` a convenient fully-degraded
/// provider for failure-path tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGateway {
    symbols: HashMap<String, SymbolData>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload data for a symbol (builder style)
    pub fn with_symbol(mut self, symbol: impl Into<String>, data: SymbolData) -> Self {
        self.symbols.insert(symbol.into(), data);
        self
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    async fn get_basic(&self, symbol: &str) -> Result<Option<BasicInfo>> {
        Ok(self.symbols.get(symbol).and_then(|d| d.basic.clone()))
    }

    async fn get_recent_quotes(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>> {
        let Some(data) = self.symbols.get(symbol) else {
            return Ok(Vec::new());
        };
        Ok(data.quotes.iter().take(limit).cloned().collect())
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>> {
        Ok(self.symbols.get(symbol).and_then(|d| d.fundamentals))
    }

    async fn get_kline_history(&self, symbol: &str, limit: usize) -> Result<Vec<Kline>> {
        let Some(data) = self.symbols.get(symbol) else {
            return Ok(Vec::new());
        };
        let skip = data.klines.len().saturating_sub(limit);
        Ok(data.klines.iter().skip(skip).cloned().collect())
    }
}
