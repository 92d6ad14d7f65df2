//! Yahoo Finance gateway implementation
//!
//! Quote and kline history come from Yahoo; company identity and
//! fundamentals are delegated to an optional [`OverviewClient`] because
//! Yahoo's quote endpoints carry neither.

use crate::error::{MarketError, Result};
use crate::gateway::MarketDataGateway;
use crate::overview::OverviewClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tickflow_core::{BasicInfo, Fundamentals, Kline, Quote};
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Gateway backed by Yahoo Finance
#[derive(Debug, Clone, Default)]
pub struct YahooGateway {
    overview: Option<OverviewClient>,
}

impl YahooGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an overview client so basic info and fundamentals resolve
    pub fn with_overview(mut self, client: OverviewClient) -> Self {
        self.overview = Some(client);
        self
    }

    /// Fetch raw daily history covering roughly the last `days` days
    async fn fetch_history(&self, symbol: &str, days: i64) -> Result<Vec<yahoo::Quote>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| MarketError::YahooFinance(e.to_string()))?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(days);

        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| MarketError::YahooFinance(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| MarketError::YahooFinance(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| MarketError::YahooFinance(e.to_string()))?;

        response
            .quotes()
            .map_err(|e| MarketError::YahooFinance(e.to_string()))
    }
}

fn to_timestamp(raw: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(raw, 0).unwrap_or_else(Utc::now)
}

#[async_trait]
impl MarketDataGateway for YahooGateway {
    async fn get_basic(&self, symbol: &str) -> Result<Option<BasicInfo>> {
        let Some(client) = &self.overview else {
            debug!(symbol, "no overview client configured, basic info unavailable");
            return Ok(None);
        };
        Ok(client.get_overview(symbol).await?.map(|o| o.basic()))
    }

    async fn get_recent_quotes(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>> {
        // Over-fetch by calendar days so weekends/holidays still yield
        // enough trading samples
        let days = (limit.max(1) as i64) * 2;
        let history = self.fetch_history(symbol, days).await?;

        let mut quotes: Vec<Quote> = history
            .iter()
            .map(|q| Quote {
                timestamp: to_timestamp(q.timestamp),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();

        // Yahoo returns chronological order; the window is newest first
        quotes.reverse();
        quotes.truncate(limit);
        Ok(quotes)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>> {
        let Some(client) = &self.overview else {
            debug!(symbol, "no overview client configured, fundamentals unavailable");
            return Ok(None);
        };
        Ok(client.get_overview(symbol).await?.map(|o| o.fundamentals()))
    }

    async fn get_kline_history(&self, symbol: &str, limit: usize) -> Result<Vec<Kline>> {
        let days = (limit.max(1) as i64) * 2;
        let history = self.fetch_history(symbol, days).await?;

        let mut klines: Vec<Kline> = history
            .iter()
            .map(|q| Kline {
                timestamp: to_timestamp(q.timestamp),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();

        // Keep the most recent candles, order stays chronological
        if klines.len() > limit {
            klines.drain(..klines.len() - limit);
        }
        Ok(klines)
    }
}
