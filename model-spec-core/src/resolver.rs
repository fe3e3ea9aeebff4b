//! The resolver seam: anything that can map (provider_id, model_id) -> ModelSpec.

use async_trait::async_trait;

use crate::spec::ModelSpec;

/// Resolves a model's context/output limits.
///
/// Implementations: [`crate::LocalFileResolver`] (static JSON file),
/// [`crate::CachedResolver`] (in-memory cache wrapper), [`crate::CompositeResolver`]
/// (first-match chain), and jan-agent's HTTP resolver against the LLM-API catalog.
#[async_trait]
pub trait ModelLimitResolver: Send + Sync {
    /// Resolves the spec for `model_id` under `provider_id`, or `None` if unknown.
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec>;
}
