//! Object store client (spec §4.4.1 step 3 "PUT to object store"). The
//! object store itself is an external collaborator (S3-compatible, reached
//! over HTTP) and out of scope per spec.md §1; this is the thin client jan-media
//! needs to reach it, following the same plain-`reqwest::Client` pattern as
//! `jan-orchestrator::conversation_client`.

use jan_core::{JanError, JanResult};

const LAYER: &str = "media_object_store";

/// What jan-media needs from the object store: upload by key, and mint a
/// presigned GET URL for later retrieval (spec §6.6 `presigned_url?`).
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> JanResult<()>;
    async fn presign_get(&self, key: &str) -> JanResult<String>;
}

/// Talks to an S3-compatible gateway that exposes a plain PUT-by-key upload
/// endpoint and a presign endpoint, rather than embedding a full AWS SDK —
/// the provider catalog and its credentials are out of scope (spec.md §1);
/// this crate only needs the two operations above.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> JanResult<()> {
        let url = format!("{}/{}/{}", self.base_url, self.bucket, key);
        let response = self
            .client
            .put(&url)
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("object store PUT failed: {e}")))?;
        if !response.status().is_success() {
            return Err(JanError::external(
                LAYER,
                format!("object store PUT returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str) -> JanResult<String> {
        let url = format!("{}/{}/{}/presign", self.base_url, self.bucket, key);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("presign request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(JanError::external(
                LAYER,
                format!("presign request returned {}", response.status()),
            ));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| JanError::external(LAYER, format!("presign response malformed: {e}")))?;
        body.get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| JanError::external(LAYER, "presign response carried no url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn put_posts_bytes_to_the_bucket_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/media/content/abc"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(reqwest::Client::new(), server.uri(), "media");
        store.put("content/abc", b"hello", "image/png").await.unwrap();
    }

    #[tokio::test]
    async fn presign_get_returns_the_url_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/media/content/abc/presign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://example.com/content/abc?sig=1"
            })))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(reqwest::Client::new(), server.uri(), "media");
        let url = store.presign_get("content/abc").await.unwrap();
        assert_eq!(url, "https://example.com/content/abc?sig=1");
    }
}
