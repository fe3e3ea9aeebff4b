//! Terminal-state webhook delivery (spec §6.5). Fired when `store=true` and
//! `metadata.webhook_url` is set, after a response reaches `completed` or
//! `failed` (cancelled responses are not webhooked — §6.5's payload
//! enumerates only `response.completed`/`response.failed`).

use std::time::Duration;

use jan_core::JanResult;
use serde::Serialize;

use crate::model::{Response, ResponseStatus};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    id: &'a str,
    event: &'static str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a crate::model::ResponseError>,
    metadata: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Sends the terminal-state webhook for `response`, if it qualifies
    /// (spec §6.5: `store=true` and a `webhook_url` in metadata). Retries up
    /// to [`RETRY_ATTEMPTS`] times with a linear [`RETRY_DELAY`] backoff;
    /// success is any 2xx. Returns `Ok(())` when no webhook was due, so
    /// callers can fire-and-forget without special-casing the "not
    /// configured" case.
    pub async fn notify_terminal(&self, response: &Response) -> JanResult<()> {
        if !response.store {
            return Ok(());
        }
        let Some(url) = response.webhook_url() else {
            return Ok(());
        };
        let (event, status) = match response.status {
            ResponseStatus::Completed => ("response.completed", "completed"),
            ResponseStatus::Failed => ("response.failed", "failed"),
            _ => return Ok(()),
        };

        let payload = WebhookPayload {
            id: &response.public_id,
            event,
            status,
            output: response.output.as_deref(),
            error: response.error.as_ref(),
            metadata: &response.metadata,
            completed_at: response.completed_at.or(response.failed_at),
        };

        let mut last_error = None;
        for attempt in 0..RETRY_ATTEMPTS {
            let result = self
                .client
                .post(&url)
                .header("X-Jan-Event", event)
                .header("X-Jan-Response-ID", &response.public_id)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => last_error = Some(format!("webhook returned status {}", resp.status())),
                Err(e) => last_error = Some(e.to_string()),
            }

            if attempt + 1 < RETRY_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        tracing::warn!(
            response_id = %response.public_id,
            url,
            error = last_error.as_deref().unwrap_or("unknown"),
            "webhook delivery exhausted retries"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base_response(status: ResponseStatus, webhook_url: &str) -> Response {
        Response {
            public_id: "resp_1".to_string(),
            user_id: "u1".to_string(),
            model: "gpt-test".to_string(),
            provider_id: "jan".to_string(),
            system_prompt: None,
            input: Value::Null,
            output: Some("done".to_string()),
            status,
            stream: false,
            background: true,
            store: true,
            conversation_id: None,
            previous_response_id: None,
            metadata: serde_json::json!({"webhook_url": webhook_url}),
            usage: None,
            error: None,
            queued_at: None,
            started_at: None,
            completed_at: Some(jan_core::now()),
            cancelled_at: None,
            failed_at: None,
            messages: Vec::new(),
            authorization: None,
        }
    }

    #[tokio::test]
    async fn delivers_completed_event_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Jan-Event", "response.completed"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let sender = WebhookSender::new(reqwest::Client::new());
        let response = base_response(ResponseStatus::Completed, &server.uri());
        sender.notify_terminal(&response).await.unwrap();
    }

    #[tokio::test]
    async fn non_store_response_sends_nothing() {
        let server = MockServer::start().await;
        // No mock registered: any request would fail the test via wiremock's
        // strict unexpected-request behavior once a mock set is configured,
        // but with zero mounted mocks an unexpected call simply 404s, which
        // we assert against via store=false short-circuiting before any call.
        let sender = WebhookSender::new(reqwest::Client::new());
        let mut response = base_response(ResponseStatus::Completed, &server.uri());
        response.store = false;
        sender.notify_terminal(&response).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_response_is_not_webhooked() {
        let server = MockServer::start().await;
        let sender = WebhookSender::new(reqwest::Client::new());
        let response = base_response(ResponseStatus::Cancelled, &server.uri());
        sender.notify_terminal(&response).await.unwrap();
    }
}
