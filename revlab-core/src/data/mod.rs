//! Data acquisition: provider trait, rate limiting, batch fetch, caching.

pub mod batch;
pub mod cache;
pub mod http;
pub mod provider;
pub mod rate_limiter;
pub mod synthetic;
pub mod universe;

pub use batch::{partition, BatchFetcher, FetchConfig};
pub use cache::{BarCache, CacheError, CacheMeta};
pub use http::{HttpProvider, HttpProviderConfig};
pub use provider::{
    DataProvider, FetchError, FetchOutcome, FetchProgress, FetchStatus, FetchSummary,
    NullProgress, StdoutProgress,
};
pub use rate_limiter::{Backoff, RateLimiter, RetryPolicy, RetryState};
pub use synthetic::SyntheticProvider;
pub use universe::{Universe, UniverseError};
