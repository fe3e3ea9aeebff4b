//! Cache wrapper: fronts any resolver with an in-memory cache so repeated lookups for
//! the same (provider, model) pair don't re-hit the catalog or disk on every request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

/// Wraps an inner [`ModelLimitResolver`] with a cache keyed on `provider_id/model_id`.
///
/// A miss falls through to `inner` and caches the result (including a miss, so a
/// model that doesn't exist isn't looked up again on every call).
pub struct CachedResolver<R: ModelLimitResolver> {
    inner: R,
    cache: Arc<RwLock<HashMap<String, Option<ModelSpec>>>>,
}

impl<R: ModelLimitResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn key(provider_id: &str, model_id: &str) -> String {
        format!("{provider_id}/{model_id}")
    }

    /// Drops the cached entry for the given pair, forcing the next `resolve` to hit `inner`.
    pub async fn invalidate(&self, provider_id: &str, model_id: &str) {
        self.cache.write().await.remove(&Self::key(provider_id, model_id));
    }

    /// Clears the entire cache.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: ModelLimitResolver> ModelLimitResolver for CachedResolver<R> {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        let key = Self::key(provider_id, model_id);

        if let Some(cached) = self.cache.read().await.get(&key) {
            return cached.clone();
        }

        let resolved = self.inner.resolve(provider_id, model_id).await;
        self.cache.write().await.insert(key, resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingResolver {
        calls: AtomicUsize,
        spec: Option<ModelSpec>,
    }

    #[async_trait]
    impl ModelLimitResolver for CountingResolver {
        async fn resolve(&self, _provider_id: &str, _model_id: &str) -> Option<ModelSpec> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.spec.clone()
        }
    }

    #[tokio::test]
    async fn caches_a_hit_after_first_lookup() {
        let inner = CountingResolver {
            calls: AtomicUsize::new(0),
            spec: Some(ModelSpec::new(64_000, 8_000)),
        };
        let cached = CachedResolver::new(inner);

        let first = cached.resolve("jan", "big-model").await.unwrap();
        let second = cached.resolve("jan", "big-model").await.unwrap();

        assert_eq!(first.context_limit, 64_000);
        assert_eq!(second.context_limit, 64_000);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caches_a_miss_too() {
        let inner = CountingResolver {
            calls: AtomicUsize::new(0),
            spec: None,
        };
        let cached = CachedResolver::new(inner);

        assert!(cached.resolve("jan", "unknown").await.is_none());
        assert!(cached.resolve("jan", "unknown").await.is_none());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_lookup() {
        let inner = CountingResolver {
            calls: AtomicUsize::new(0),
            spec: Some(ModelSpec::new(64_000, 8_000)),
        };
        let cached = CachedResolver::new(inner);

        cached.resolve("jan", "big-model").await;
        cached.invalidate("jan", "big-model").await;
        cached.resolve("jan", "big-model").await;

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }
}
