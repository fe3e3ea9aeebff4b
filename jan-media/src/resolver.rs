//! Placeholder resolver (spec §4.4.2, §4.4.3): a pure function of
//! `(messages, auth) -> messages`. Scans every message's content for
//! `data:<mime>;jan_<ulid>` references and, if any are found, sends the whole
//! batch to the media-api `/resolve` endpoint for substitution.
//!
//! The placeholder syntax uses a semicolon where RFC 2397 would use a comma
//! (spec §9 Open Questions) — intentional, and exactly why a plain
//! `data:`-URL parser must not be reused here.

use once_cell::sync::Lazy;
use regex::Regex;

use jan_agent::Message;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:[^;,\s]+;jan_[A-Za-z0-9]+").expect("valid placeholder regex"));

fn contains_placeholder(content: &str) -> bool {
    PLACEHOLDER_RE.is_match(content)
}

pub struct MediaResolver {
    client: reqwest::Client,
    resolve_url: Option<String>,
    timeout: std::time::Duration,
}

impl MediaResolver {
    pub fn new(client: reqwest::Client, resolve_url: Option<String>, timeout: std::time::Duration) -> Self {
        Self {
            client,
            resolve_url,
            timeout,
        }
    }

    /// spec §4.4.3: "if no placeholder is found, the input is returned
    /// unchanged; no network call is made." Resolve failures propagate as a
    /// 502-class error (handled by [`jan_core::ErrorKind::External`]); the
    /// orchestrator does not retry (spec §4.4.3).
    pub async fn resolve(&self, messages: Vec<Message>, authorization: &str) -> jan_core::JanResult<Vec<Message>> {
        let has_placeholder = messages
            .iter()
            .any(|m| m.content.as_deref().map(contains_placeholder).unwrap_or(false));
        if !has_placeholder {
            return Ok(messages);
        }

        let Some(resolve_url) = self.resolve_url.as_deref() else {
            return Err(crate::error::external(
                "message contains a media placeholder but no MEDIA_RESOLVE_URL is configured",
            ));
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(resolve_url)
                .header("Authorization", authorization)
                .json(&serde_json::json!({ "messages": messages }))
                .send(),
        )
        .await
        .map_err(|_| crate::error::external("media resolve request timed out"))?
        .map_err(|e| crate::error::external(format!("media resolve request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(crate::error::external(format!(
                "media resolve returned {}",
                response.status()
            )));
        }

        let body: ResolveResponse = response
            .json()
            .await
            .map_err(|e| crate::error::external(format!("media resolve response malformed: {e}")))?;
        Ok(body.messages)
    }
}

#[derive(serde::Deserialize)]
struct ResolveResponse {
    messages: Vec<Message>,
}
