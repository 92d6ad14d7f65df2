//! TTL cache decorator for gateways
//!
//! Quote data goes stale in minutes, fundamentals in hours, so the two
//! live in separate timed caches. Only successful answers are cached;
//! provider errors always retry on the next call.

use crate::error::Result;
use crate::gateway::MarketDataGateway;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tickflow_core::{BasicInfo, Fundamentals, Kline, Quote};
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key for gateway requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    endpoint: &'static str,
    limit: usize,
}

impl CacheKey {
    fn new(symbol: &str, endpoint: &'static str, limit: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            endpoint,
            limit,
        }
    }
}

type SharedCache = Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>;

/// Wraps any gateway with per-endpoint TTL caching
pub struct CachedGateway<G> {
    inner: G,
    realtime: SharedCache,
    fundamental: SharedCache,
}

impl<G: MarketDataGateway> CachedGateway<G> {
    /// Create a cached gateway with explicit TTLs
    pub fn new(inner: G, realtime_ttl: Duration, fundamental_ttl: Duration) -> Self {
        Self {
            inner,
            realtime: Arc::new(RwLock::new(TimedCache::with_lifespan(realtime_ttl))),
            fundamental: Arc::new(RwLock::new(TimedCache::with_lifespan(fundamental_ttl))),
        }
    }

    /// Default TTLs: one minute for quotes, one hour for fundamentals
    pub fn with_default_ttls(inner: G) -> Self {
        Self::new(inner, Duration::from_secs(60), Duration::from_secs(3600))
    }

    async fn lookup<T: DeserializeOwned>(cache: &SharedCache, key: &CacheKey) -> Option<T> {
        let mut cache = cache.write().await;
        let value = cache.cache_get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    async fn store<T: Serialize>(cache: &SharedCache, key: CacheKey, value: &T) {
        if let Ok(json) = serde_json::to_value(value) {
            let mut cache = cache.write().await;
            let _ = cache.cache_set(key, json);
        }
    }
}

#[async_trait]
impl<G: MarketDataGateway> MarketDataGateway for CachedGateway<G> {
    async fn get_basic(&self, symbol: &str) -> Result<Option<BasicInfo>> {
        let key = CacheKey::new(symbol, "basic", 0);
        if let Some(hit) = Self::lookup(&self.fundamental, &key).await {
            debug!(symbol, endpoint = "basic", "cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.get_basic(symbol).await?;
        Self::store(&self.fundamental, key, &fresh).await;
        Ok(fresh)
    }

    async fn get_recent_quotes(&self, symbol: &str, limit: usize) -> Result<Vec<Quote>> {
        let key = CacheKey::new(symbol, "quotes", limit);
        if let Some(hit) = Self::lookup(&self.realtime, &key).await {
            debug!(symbol, endpoint = "quotes", "cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.get_recent_quotes(symbol, limit).await?;
        Self::store(&self.realtime, key, &fresh).await;
        Ok(fresh)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>> {
        let key = CacheKey::new(symbol, "fundamentals", 0);
        if let Some(hit) = Self::lookup(&self.fundamental, &key).await {
            debug!(symbol, endpoint = "fundamentals", "cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.get_fundamentals(symbol).await?;
        Self::store(&self.fundamental, key, &fresh).await;
        Ok(fresh)
    }

    async fn get_kline_history(&self, symbol: &str, limit: usize) -> Result<Vec<Kline>> {
        let key = CacheKey::new(symbol, "klines", limit);
        if let Some(hit) = Self::lookup(&self.realtime, &key).await {
            debug!(symbol, endpoint = "klines", "cache hit");
            return Ok(hit);
        }
        let fresh = self.inner.get_kline_history(symbol, limit).await?;
        Self::store(&self.realtime, key, &fresh).await;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gateway that counts calls so tests can observe cache behavior
    #[derive(Default)]
    struct CountingGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataGateway for CountingGateway {
        async fn get_basic(&self, _symbol: &str) -> Result<Option<BasicInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(BasicInfo {
                name: "Test Co".to_string(),
                industry: "Testing".to_string(),
            }))
        }

        async fn get_recent_quotes(&self, _symbol: &str, _limit: usize) -> Result<Vec<Quote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn get_fundamentals(&self, _symbol: &str) -> Result<Option<Fundamentals>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn get_kline_history(&self, _symbol: &str, _limit: usize) -> Result<Vec<Kline>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let cached = CachedGateway::with_default_ttls(CountingGateway::default());

        let first = cached.get_basic("AAPL").await.unwrap();
        let second = cached.get_basic("AAPL").await.unwrap();

        assert_eq!(first.unwrap().name, "Test Co");
        assert_eq!(second.unwrap().name, "Test Co");
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_data_answers_are_cached_too() {
        let cached = CachedGateway::with_default_ttls(CountingGateway::default());

        assert!(cached.get_fundamentals("AAPL").await.unwrap().is_none());
        assert!(cached.get_fundamentals("AAPL").await.unwrap().is_none());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_symbols_do_not_collide() {
        let cached = CachedGateway::with_default_ttls(CountingGateway::default());

        cached.get_basic("AAPL").await.unwrap();
        cached.get_basic("MSFT").await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_quote_limit_is_part_of_the_key() {
        let cached = CachedGateway::with_default_ttls(CountingGateway::default());

        cached.get_recent_quotes("AAPL", 10).await.unwrap();
        cached.get_recent_quotes("AAPL", 20).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
