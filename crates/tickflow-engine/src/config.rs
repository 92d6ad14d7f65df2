//! Engine configuration

use std::time::Duration;
use tickflow_core::{Error, Result};

/// Tunables for the execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a running task may go without a successful operation
    /// before it is presumed abandoned by its client
    ///
    /// The client ticks every 2-3 seconds, so the default tolerates tens
    /// of missed polls (tab backgrounding, transient network loss) before
    /// declaring abandonment.
    pub stale_timeout: Duration,

    /// Quote samples fetched into the analysis window
    pub quote_window: usize,

    /// Kline candles fetched for the result payload
    pub kline_limit: usize,

    /// Upper bound on tasks returned by list/cancel-all scans
    pub list_scan_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_timeout: Duration::from_secs(150),
            quote_window: 20,
            kline_limit: 30,
            list_scan_limit: 200,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stale_timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "stale_timeout must be non-zero".to_string(),
            ));
        }
        if self.quote_window < 2 {
            return Err(Error::InvalidArgument(
                "quote_window must hold at least two samples".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    stale_timeout: Option<Duration>,
    quote_window: Option<usize>,
    kline_limit: Option<usize>,
    list_scan_limit: Option<usize>,
}

impl EngineConfigBuilder {
    /// Set the staleness timeout
    pub fn stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = Some(timeout);
        self
    }

    /// Set the quote window size
    pub fn quote_window(mut self, window: usize) -> Self {
        self.quote_window = Some(window);
        self
    }

    /// Set the kline history limit
    pub fn kline_limit(mut self, limit: usize) -> Self {
        self.kline_limit = Some(limit);
        self
    }

    /// Set the list scan limit
    pub fn list_scan_limit(mut self, limit: usize) -> Self {
        self.list_scan_limit = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            stale_timeout: self.stale_timeout.unwrap_or(defaults.stale_timeout),
            quote_window: self.quote_window.unwrap_or(defaults.quote_window),
            kline_limit: self.kline_limit.unwrap_or(defaults.kline_limit),
            list_scan_limit: self.list_scan_limit.unwrap_or(defaults.list_scan_limit),
        };

        config.validate()?;
        Ok(config)
    }
}
