//! Market data gateway for the tickflow pipeline
//!
//! The engine only ever talks to the [`MarketDataGateway`] trait. Behind
//! it live:
//!
//! - [`YahooGateway`]: quote and kline history via Yahoo Finance, with
//!   company overview/fundamentals from an optional HTTP data service
//! - [`CachedGateway`]: a TTL-cache decorator over any gateway
//! - [`StaticGateway`]: a deterministic in-memory provider for offline
//!   runs and tests
//!
//! A provider returning no data is never an error here; the pipeline
//! treats missing market data as a neutral signal.

pub mod cache;
pub mod error;
pub mod fixture;
pub mod gateway;
pub mod overview;
pub mod yahoo;

pub use cache::CachedGateway;
pub use error::{MarketError, Result};
pub use fixture::{StaticGateway, SymbolData};
pub use gateway::{MarketDataGateway, provider_symbol};
pub use overview::{CompanyOverview, OverviewClient};
pub use yahoo::YahooGateway;
