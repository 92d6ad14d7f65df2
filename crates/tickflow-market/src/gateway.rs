//! The gateway trait and provider symbol resolution

use crate::error::Result;
use async_trait::async_trait;
use tickflow_core::{BasicInfo, Fundamentals, Kline, Market, Quote};

/// Read-only source of market data for the pipeline
///
/// Every method may answer "no data" (a `None` or an empty series) without
/// that being an error. Implementations must be safe to call concurrently
/// for different symbols.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Basic identity/classification for a symbol
    async fn get_basic(&self, symbol: &str) -> Result<Option<BasicInfo>>;

    /// Recent quote window, newest first, at most `limit` samples
    async fn get_recent_quotes(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>>;

    /// Fundamental ratios for a symbol
    async fn get_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>>;

    /// Chronological OHLCV history, at most `limit` candles
    async fn get_kline_history(&self, symbol: &str, limit: usize) -> Result<Vec<Kline>>;
}

/// Map a dashboard symbol to the ticker the upstream provider expects
///
/// Domestic A-shares carry a Shanghai/Shenzhen suffix (60xxxx trades in
/// Shanghai), Hong Kong tickers are zero-padded to four digits, US symbols
/// pass through unchanged.
pub fn provider_symbol(symbol: &str, market: Market) -> String {
    match market {
        Market::Domestic => {
            if symbol.starts_with('6') {
                format!("{symbol}.SS")
            } else {
                format!("{symbol}.SZ")
            }
        }
        Market::HongKong => {
            let digits = symbol.trim_start_matches('0');
            format!("{digits:0>4}.HK")
        }
        Market::Us => symbol.to_string(),
    }
}
