//! Offline cache gateway for the campus site.
//!
//! Keeps static assets usable without connectivity while backend, analytics and
//! avatar requests always go to the network.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod request;

pub use cache::{Cache, CacheStorage, MemoryCache, MemoryCacheStorage};
pub use config::{
    CachePolicy, GatewayConfig, EXCLUDED_HOSTS, OFFLINE_FALLBACK, PRECACHE_NAME, PRECACHE_PATHS,
    RUNTIME_CACHE_NAME,
};
pub use error::{FetchError, GatewayError, GatewayResult};
pub use fetch::{Fetcher, HttpFetcher};
pub use gateway::{GatewayMessage, Intercept, LifecycleState, OfflineGateway};
pub use request::{CacheKey, CachedResponse, GatewayRequest, RequestMode};
