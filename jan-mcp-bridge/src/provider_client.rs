//! Resilient HTTP client for an external search/scrape/sandbox provider (spec §4.2.5).
//!
//! Wraps a `reqwest::Client` with a per-provider [`CircuitBreaker`], exponential
//! backoff retry, and the connection-pool caps from `jan_config::ProviderResilience`.

use std::time::Duration;

use jan_config::ProviderResilience;
use jan_core::JanResult;
use reqwest::Client;
use serde_json::Value;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::external;

pub struct ProviderClient {
    client: Client,
    breaker: CircuitBreaker,
    resilience: ProviderResilience,
    base_url: String,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, resilience: ProviderResilience) -> Self {
        let client = Client::builder()
            .timeout(resilience.http_timeout)
            .pool_max_idle_per_host(resilience.max_idle_conns)
            .pool_idle_timeout(resilience.idle_conn_timeout)
            .build()
            .expect("provider http client");
        Self {
            client,
            breaker: CircuitBreaker::new(crate::circuit_breaker::CircuitBreakerConfig {
                failure_threshold: resilience.cb_failure_threshold,
                success_threshold: resilience.cb_success_threshold,
                timeout: resilience.cb_timeout,
                max_half_open: resilience.cb_max_half_open,
            }),
            resilience,
            base_url: base_url.into(),
        }
    }

    /// POSTs `body` to `path` under the provider's base URL, retrying with
    /// exponential backoff up to `retry_max_attempts` times, gated by the
    /// circuit breaker. `timeout` overrides the default (spec: scrape gets 30s).
    pub async fn post_json(
        &self,
        path: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> JanResult<Value> {
        if !self.breaker.should_allow() {
            return Err(external(format!(
                "circuit breaker open for provider at {}",
                self.base_url
            )));
        }

        let url = format!("{}{}", self.base_url, path);
        let mut delay = self.resilience.retry_initial_delay;
        let mut last_err = None;

        for attempt in 0..self.resilience.retry_max_attempts {
            let mut req = self.client.post(&url).json(&body);
            if let Some(t) = timeout {
                req = req.timeout(t);
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let value = resp
                        .json::<Value>()
                        .await
                        .map_err(|e| external(format!("provider response body: {e}")));
                    match value {
                        Ok(v) => {
                            self.breaker.record_success();
                            return Ok(v);
                        }
                        Err(e) => {
                            self.breaker.record_failure();
                            last_err = Some(e);
                        }
                    }
                }
                Ok(resp) => {
                    self.breaker.record_failure();
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    last_err = Some(external(format!("provider HTTP {status}: {text}")));
                }
                Err(e) => {
                    self.breaker.record_failure();
                    last_err = Some(external(format!("provider request failed: {e}")));
                }
            }

            if attempt + 1 < self.resilience.retry_max_attempts {
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * self.resilience.retry_backoff_factor)
                        .min(self.resilience.retry_max_delay.as_secs_f64()),
                );
            }
        }

        Err(last_err.unwrap_or_else(|| external("provider call exhausted retries")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_resilience() -> ProviderResilience {
        ProviderResilience {
            retry_max_attempts: 3,
            retry_initial_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), fast_resilience());
        let result = client
            .post_json("/search", serde_json::json!({"q": "x"}), None)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), fast_resilience());
        let err = client
            .post_json("/search", serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::External);
    }
}
