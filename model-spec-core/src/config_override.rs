//! Config override resolver: operator-supplied overrides take priority over any catalog lookup.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

/// Resolves model specs from a static map supplied at startup (e.g. parsed from
/// jan-config's `config.toml`), so an operator can pin a context limit without
/// waiting on the upstream catalog.
pub struct ConfigOverride {
    overrides: HashMap<String, ModelSpec>,
}

impl ConfigOverride {
    pub fn new(overrides: HashMap<String, ModelSpec>) -> Self {
        Self { overrides }
    }

    pub fn empty() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    fn key(provider_id: &str, model_id: &str) -> String {
        format!("{provider_id}/{model_id}")
    }
}

#[async_trait]
impl ModelLimitResolver for ConfigOverride {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        self.overrides.get(&Self::key(provider_id, model_id)).cloned()
    }
}
