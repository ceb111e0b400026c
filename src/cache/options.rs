//! Request Options
//!
//! Per-call options for lookups and writes, plus the batch request types used
//! by prefetch and warm-up.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::cache::Validators;

/// Options accepted by `get` and `set`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// TTL override for the entry this call writes
    pub ttl: Option<Duration>,
    /// Skip the cached value and fetch
    pub force: bool,
    /// Serve a stale value while a refresh runs
    pub background: bool,
    /// Metadata stored on the entry this call writes
    pub validators: Validators,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.validators.etag = Some(etag.into());
        self
    }

    pub fn last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.validators.last_modified = Some(last_modified.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.validators.metadata = Some(metadata);
        self
    }
}

/// Boxed fetch function as stored in batch requests.
pub type BoxedFetch<V> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<V>> + Send>;

/// One entry of a `prefetch` batch.
pub struct PrefetchRequest<V> {
    pub key: String,
    pub fetch: BoxedFetch<V>,
    pub options: RequestOptions,
}

impl<V> PrefetchRequest<V> {
    pub fn new<F, Fut>(key: impl Into<String>, fetch: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        Self {
            key: key.into(),
            fetch: Box::new(move || fetch().boxed()),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

impl<V> fmt::Debug for PrefetchRequest<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchRequest")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One entry of a `warm_up` batch.
#[derive(Debug, Clone)]
pub struct WarmUpEntry<V> {
    pub key: String,
    pub value: V,
    pub options: RequestOptions,
}

impl<V> WarmUpEntry<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .ttl(Duration::from_secs(30))
            .background()
            .etag("W/\"1\"")
            .metadata(serde_json::json!({"source": "dashboard"}));

        assert_eq!(options.ttl, Some(Duration::from_secs(30)));
        assert!(options.background);
        assert!(!options.force);
        assert_eq!(options.validators.etag.as_deref(), Some("W/\"1\""));
        assert!(options.validators.metadata.is_some());
    }

    #[tokio::test]
    async fn test_prefetch_request_boxes_fetch() {
        let request = PrefetchRequest::new("/api/teams", || async { Ok(7u32) });
        assert_eq!(request.key, "/api/teams");
        assert_eq!((request.fetch)().await.unwrap(), 7);
    }
}
