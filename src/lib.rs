//! Request Cache - a client-side cache for remote data
//!
//! Keyed by normalized request identifiers, with TTL expiration,
//! stale-while-revalidate refresh, single-flight fetching, insertion-order
//! eviction and best-effort persistence. Ships with an HTTP admin API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheStats, RequestCache, RequestOptions};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, FetchError};
pub use tasks::spawn_sweep_task;
