//! Resolves model specs from a static JSON file on disk, keyed by provider then model id.
//!
//! The file format mirrors a models.dev-style catalog dump:
//! `{"<provider_id>": {"<model_id>": {"context_limit": .., "output_limit": ..}}}`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::resolver::ModelLimitResolver;
use crate::spec::ModelSpec;

#[derive(Debug, Deserialize)]
struct RawEntry {
    context_limit: u32,
    output_limit: u32,
    #[serde(default)]
    cache_read: Option<u32>,
    #[serde(default)]
    cache_write: Option<u32>,
}

type Catalog = HashMap<String, HashMap<String, RawEntry>>;

/// Reads `path` fresh on every lookup, so an operator can edit the file without
/// restarting the process. Pair with [`crate::CachedResolver`] if that's undesirable.
pub struct LocalFileResolver {
    path: PathBuf,
}

impl LocalFileResolver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ModelLimitResolver for LocalFileResolver {
    async fn resolve(&self, provider_id: &str, model_id: &str) -> Option<ModelSpec> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        let catalog: Catalog = serde_json::from_slice(&bytes).ok()?;
        catalog
            .get(provider_id)
            .and_then(|models| models.get(model_id))
            .map(|raw| ModelSpec {
                context_limit: raw.context_limit,
                output_limit: raw.output_limit,
                cache_read: raw.cache_read,
                cache_write: raw.cache_write,
            })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    async fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut handle = tokio::fs::File::create(file.path()).await.unwrap();
        handle.write_all(contents.as_bytes()).await.unwrap();
        handle.flush().await.unwrap();
        file
    }

    #[tokio::test]
    async fn resolves_known_model() {
        let file = write_catalog(
            r#"{"jan": {"jan-v1": {"context_limit": 131072, "output_limit": 8192}}}"#,
        )
        .await;
        let resolver = LocalFileResolver::new(file.path());

        let spec = resolver.resolve("jan", "jan-v1").await.unwrap();
        assert_eq!(spec.context_limit, 131_072);
        assert_eq!(spec.output_limit, 8_192);
    }

    #[tokio::test]
    async fn unknown_model_resolves_to_none() {
        let file = write_catalog(r#"{"jan": {}}"#).await;
        let resolver = LocalFileResolver::new(file.path());

        assert!(resolver.resolve("jan", "ghost-model").await.is_none());
    }

    #[tokio::test]
    async fn missing_file_resolves_to_none_rather_than_erroring() {
        let resolver = LocalFileResolver::new("/nonexistent/path/catalog.json");
        assert!(resolver.resolve("jan", "jan-v1").await.is_none());
    }
}
