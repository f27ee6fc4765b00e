//! Exchange-rate provider: remote source plus day-scoped caching.

pub mod cache;
pub mod cbr;

pub use cache::ExchangeRateData;
pub use cbr::{CacheStatus, CbrClient, CbrClientError, RatePayload, REFRESH_INTERVAL};
