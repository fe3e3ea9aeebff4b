//! HTTP-backed [`ModelLimitResolver`] against the external LLM-API's model
//! catalog endpoint (spec §4.1.3 step 2: "fetch model context length"). The
//! catalog service itself is out of scope here — this is only the client side
//! of that wire contract, wrapped the same way `LocalFileResolver` wraps a
//! file read.

use async_trait::async_trait;
use model_spec_core::{ModelLimitResolver, ModelSpec};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    context_limit: u32,
    output_limit: u32,
    #[serde(default)]
    cache_read: Option<u32>,
    #[serde(default)]
    cache_write: Option<u32>,
}

/// Resolves against `GET {base_url}/v1/models/{provider_id}/{model_id}/limits`.
/// Network failures and non-2xx responses resolve to `None` so callers fall
/// back to [`model_spec_core::ModelSpec::fallback_default`] rather than fail
/// the whole request over a catalog hiccup.
pub struct HttpCatalogResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ModelLimitResolver for HttpCatalogResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        let url = format!(
            "{}/v1/models/{provider_id}/{model_id}/limits",
            self.base_url.trim_end_matches('/')
        );
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let raw: CatalogResponse = response.json().await.ok()?;
        Some(ModelSpec {
            context_limit: raw.context_limit,
            output_limit: raw.output_limit,
            cache_read: raw.cache_read,
            cache_write: raw.cache_write,
        })
    }
}
