//! Cache Module
//!
//! Request cache engine with TTL expiration, stale-while-revalidate refresh,
//! insertion-order eviction and best-effort persistence.

mod clock;
mod engine;
mod entry;
pub mod eviction;
mod key;
mod options;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use engine::{CacheValue, RequestCache};
pub use entry::{CacheEntry, Validators};
pub use key::KeyNormalizer;
pub use options::{BoxedFetch, PrefetchRequest, RequestOptions, WarmUpEntry};
pub use stats::CacheStats;
pub use store::Store;
