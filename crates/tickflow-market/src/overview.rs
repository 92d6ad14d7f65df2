//! HTTP client for the company overview data service
//!
//! Supplies the two things Yahoo's quote endpoints do not: company
//! identity (name, industry) and fundamental ratios. The wire format is
//! the Alpha-Vantage-style OVERVIEW document: flat JSON with PascalCase
//! keys and stringly-typed numbers, parsed tolerantly because fields come
//! and go per listing.

use crate::error::{MarketError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tickflow_core::{BasicInfo, Fundamentals};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Parsed overview document for one symbol
#[derive(Debug, Clone)]
pub struct CompanyOverview {
    pub name: String,
    pub industry: String,
    /// Percent, not fraction
    pub roe: f64,
    pub pe: f64,
    pub pb: f64,
    /// Percent, not fraction
    pub revenue_growth: f64,
}

impl CompanyOverview {
    pub fn basic(&self) -> BasicInfo {
        BasicInfo {
            name: self.name.clone(),
            industry: self.industry.clone(),
        }
    }

    pub fn fundamentals(&self) -> Fundamentals {
        Fundamentals {
            roe: self.roe,
            pe: self.pe,
            pb: self.pb,
            revenue_growth: self.revenue_growth,
        }
    }
}

/// Rate-limited client for the overview endpoint
#[derive(Debug, Clone)]
pub struct OverviewClient {
    client: Client,
    base_url: String,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl OverviewClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Overview service query endpoint
    /// * `api_key` - Service API key
    /// * `rate_limit` - Maximum requests per minute (default: 5 for free tier)
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        rate_limit: u32,
    ) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN.saturating_add(4)));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter,
        }
    }

    /// Create from the OVERVIEW_API_KEY environment variable
    pub fn from_env(base_url: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OVERVIEW_API_KEY").map_err(|_| {
            MarketError::ConfigError("OVERVIEW_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self::new(base_url, api_key, 5)) // Default to free tier limit
    }

    /// Fetch the overview document for a symbol
    ///
    /// Returns `Ok(None)` when the service has no listing for the symbol.
    pub async fn get_overview(&self, symbol: &str) -> Result<Option<CompanyOverview>> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let mut params = HashMap::new();
        params.insert("function", "OVERVIEW");
        params.insert("symbol", symbol);
        params.insert("apikey", &self.api_key);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::Overview(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response.json().await?;

        // Check for API error messages
        if let Some(error) = data.get("Error Message") {
            return Err(MarketError::Overview(error.to_string()));
        }

        if data.get("Note").is_some() {
            return Err(MarketError::RateLimitExceeded {
                provider: "overview".to_string(),
            });
        }

        let Some(name) = data.get("Name").and_then(|v| v.as_str()) else {
            // Empty document: the service knows nothing about this symbol
            return Ok(None);
        };

        let industry = data
            .get("Industry")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Some(CompanyOverview {
            name: name.to_string(),
            industry,
            // The service reports equity return and growth as fractions
            roe: parse_field(&data, "ReturnOnEquityTTM") * 100.0,
            pe: parse_field(&data, "PERatio"),
            pb: parse_field(&data, "PriceToBookRatio"),
            revenue_growth: parse_field(&data, "QuarterlyRevenueGrowthYOY") * 100.0,
        }))
    }
}

/// Parse a stringly-typed numeric field; absent or malformed means 0.0
fn parse_field(data: &serde_json::Value, key: &str) -> f64 {
    data.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_tolerates_garbage() {
        let data = serde_json::json!({
            "PERatio": "18.5",
            "PriceToBookRatio": "None",
        });
        assert!((parse_field(&data, "PERatio") - 18.5).abs() < 1e-9);
        assert_eq!(parse_field(&data, "PriceToBookRatio"), 0.0);
        assert_eq!(parse_field(&data, "Missing"), 0.0);
    }

    #[test]
    fn test_overview_projections() {
        let overview = CompanyOverview {
            name: "Kweichow Moutai".to_string(),
            industry: "Beverages".to_string(),
            roe: 28.0,
            pe: 30.0,
            pb: 9.0,
            revenue_growth: 15.0,
        };
        let basic = overview.basic();
        assert_eq!(basic.name, "Kweichow Moutai");
        let fundamentals = overview.fundamentals();
        assert!((fundamentals.roe - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_client_construction_clamps_rate_limit() {
        let client = OverviewClient::new("http://localhost:9999/query", "key", 0);
        assert_eq!(client.base_url, "http://localhost:9999/query");
    }
}
