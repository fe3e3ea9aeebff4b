//! Chains resolvers in priority order: first one to return `Some` wins.

use async_trait::async_trait;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

/// Tries each resolver in order, returning the first `Some`. Typically built as
/// `ConfigOverride` (operator pins) -> `CachedResolver<HTTP catalog>` (live data) ->
/// a resolver that always returns [`ModelSpec::fallback_default`].
pub struct CompositeResolver {
    resolvers: Vec<Box<dyn ModelLimitResolver>>,
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Box<dyn ModelLimitResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl ModelLimitResolver for CompositeResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        for resolver in &self.resolvers {
            if let Some(spec) = resolver.resolve(provider_id, model_id).await {
                return Some(spec);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_override::ConfigOverride;

    #[tokio::test]
    async fn first_match_wins() {
        let mut overrides = std::collections::HashMap::new();
        overrides.insert("jan/jan-v1".to_string(), ModelSpec::new(200_000, 8_000));

        let composite = CompositeResolver::new(vec![
            Box::new(ConfigOverride::new(overrides)),
            Box::new(ConfigOverride::empty()),
        ]);

        let spec = composite.resolve("jan", "jan-v1").await.unwrap();
        assert_eq!(spec.context_limit, 200_000);
    }

    #[tokio::test]
    async fn falls_through_to_later_resolvers() {
        let composite = CompositeResolver::new(vec![
            Box::new(ConfigOverride::empty()),
            Box::new(ConfigOverride::empty()),
        ]);

        assert!(composite.resolve("jan", "jan-v1").await.is_none());
    }
}
