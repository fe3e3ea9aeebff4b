//! Background worker pool (spec §4.1.2 "Background" mode, §3.6 Queue Task).
//!
//! Each worker repeatedly claims the oldest queued background response via
//! [`crate::store::SqliteResponseStore::claim_next_queued`], runs the same
//! tool loop used by the synchronous path against a detached context, and
//! transitions the row to its terminal state, firing a webhook if `store`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::{Response, ResponseStatus};
use crate::store::SqliteResponseStore;
use crate::tool_loop::{LoopOutcomeKind, ToolLoop, ToolLoopContext};
use crate::webhook::WebhookSender;

/// Idle poll interval when no row is queued. Not part of spec.md's named
/// config surface; distinct from `SessionCleanupInterval`, which governs the
/// realtime reconciler instead.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct WorkerPoolConfig {
    pub worker_count: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { worker_count: 4 }
    }
}

pub struct BackgroundWorkerPool {
    store: Arc<SqliteResponseStore>,
    tool_loop: Arc<ToolLoop>,
    webhook: Arc<WebhookSender>,
    config: WorkerPoolConfig,
}

impl BackgroundWorkerPool {
    pub fn new(
        store: Arc<SqliteResponseStore>,
        tool_loop: Arc<ToolLoop>,
        webhook: Arc<WebhookSender>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            store,
            tool_loop,
            webhook,
            config,
        }
    }

    /// Spawns `worker_count` tasks that run until `cancellation` fires
    /// (spec SPEC_FULL.md §2: graceful shutdown extended to the worker pool).
    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..self.config.worker_count)
            .map(|worker_id| {
                let pool = Arc::clone(&self);
                let cancellation = cancellation.clone();
                tokio::spawn(async move { pool.run_worker(worker_id, cancellation).await })
            })
            .collect()
    }

    async fn run_worker(&self, worker_id: usize, cancellation: CancellationToken) {
        loop {
            if cancellation.is_cancelled() {
                return;
            }

            match self.store.claim_next_queued().await {
                Ok(Some(response)) => {
                    tracing::info!(worker_id, response_id = %response.public_id, "claimed background response");
                    self.process(response).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                        _ = cancellation.cancelled() => return,
                    }
                }
                Err(e) => {
                    tracing::warn!(worker_id, error = %e, "dequeue failed");
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn process(&self, response: Response) {
        let response_id = response.public_id.clone();
        let mut response = response;

        let ctx = ToolLoopContext {
            model: response.model.clone(),
            provider_id: response.provider_id.clone(),
            messages: response.messages.clone(),
            conversation_id: response.conversation_id.clone(),
            authorization: response.authorization.clone().unwrap_or_default(),
            response_id: response_id.clone(),
        };

        match self.tool_loop.run(ctx).await {
            Ok(result) => {
                response.output = Some(result.output.clone());
                response.usage = result.usage;
                response.messages = result.messages;
                response.status = ResponseStatus::Completed;
                response.completed_at = Some(jan_core::now());
                if result.kind == LoopOutcomeKind::DepthExceeded {
                    response.error = Some(crate::model::ResponseError {
                        code: "max_tool_depth_exceeded".to_string(),
                        message: "tool loop reached its maximum depth before finishing".to_string(),
                    });
                }
            }
            Err(e) => {
                response.status = ResponseStatus::Failed;
                response.failed_at = Some(jan_core::now());
                response.error = Some(crate::model::ResponseError {
                    code: "upstream_unavailable".to_string(),
                    message: e.message,
                });
            }
        }

        if let Err(e) = self.store.update(&response).await {
            tracing::error!(response_id = %response_id, error = %e, "failed to persist worker result");
            return;
        }
        if let Err(e) = self.webhook.notify_terminal(&response).await {
            tracing::warn!(response_id = %response_id, error = %e, "webhook delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jan_agent::{AgentError, FinishReason, LlmClient, LlmResponse, Message, ToolChoiceMode};
    use model_spec_core::{ModelLimitResolver, ModelSpec};
    use serde_json::Value;
    use wiremock::MockServer;

    struct ImmediateStopLlm;

    #[async_trait]
    impl LlmClient for ImmediateStopLlm {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[Value],
            _tool_choice: ToolChoiceMode,
        ) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse {
                content: "done".to_string(),
                tool_calls: vec![],
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl ModelLimitResolver for NeverResolves {
        async fn resolve(&self, _: &str, _: &str) -> Option<ModelSpec> {
            None
        }
    }

    struct CallsToolThenStopsLlm {
        turn: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl LlmClient for CallsToolThenStopsLlm {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[Value],
            _tool_choice: ToolChoiceMode,
        ) -> Result<LlmResponse, AgentError> {
            use std::sync::atomic::Ordering;
            if self.turn.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(LlmResponse {
                    content: String::new(),
                    tool_calls: vec![jan_agent::ToolCall {
                        id: "c1".to_string(),
                        name: "search".to_string(),
                        arguments: "{\"q\": \"rust\"}".to_string(),
                    }],
                    finish_reason: FinishReason::ToolCalls,
                    usage: None,
                })
            } else {
                Ok(LlmResponse {
                    content: "found it".to_string(),
                    tool_calls: vec![],
                    finish_reason: FinishReason::Stop,
                    usage: None,
                })
            }
        }
    }

    fn sample_response(id: &str) -> Response {
        Response {
            public_id: id.to_string(),
            user_id: "u1".to_string(),
            model: "gpt-test".to_string(),
            provider_id: "jan".to_string(),
            system_prompt: None,
            input: Value::Null,
            output: None,
            status: ResponseStatus::Queued,
            stream: false,
            background: true,
            store: false,
            conversation_id: None,
            previous_response_id: None,
            metadata: Value::Null,
            usage: None,
            error: None,
            queued_at: Some(jan_core::now()),
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            failed_at: None,
            messages: vec![Message::system("sys"), Message::user("hi")],
            authorization: None,
        }
    }

    #[tokio::test]
    async fn worker_claims_and_completes_a_queued_response() {
        let server = MockServer::start().await;
        let store = Arc::new(SqliteResponseStore::open_in_memory().unwrap());
        store.insert(&sample_response("resp_1")).await.unwrap();

        let client = reqwest::Client::new();
        let tool_loop = Arc::new(ToolLoop::new(
            Arc::new(ImmediateStopLlm),
            Arc::new(crate::mcp_client::McpClient::new(client.clone(), server.uri())),
            Arc::new(crate::conversation_client::ConversationClient::new(client.clone(), server.uri())),
            Arc::new(jan_mcp_bridge::WriteBackClient::new(server.uri())),
            Arc::new(NeverResolves),
            Arc::new(jan_config::Settings::default()),
            Arc::clone(&store),
        ));
        let webhook = Arc::new(WebhookSender::new(client));
        let pool = Arc::new(BackgroundWorkerPool::new(
            Arc::clone(&store),
            tool_loop,
            webhook,
            WorkerPoolConfig { worker_count: 1 },
        ));

        let cancellation = CancellationToken::new();
        let handles = pool.spawn(cancellation.clone());

        // Give the single worker a chance to claim and process the row, then stop it.
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancellation.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        let updated = store.get("resp_1").await.unwrap().unwrap();
        assert_eq!(updated.status, ResponseStatus::Completed);
        assert_eq!(updated.output.as_deref(), Some("done"));
    }

    /// spec §3.2/§8.1: a background response whose tool loop surfaces one
    /// tool call persists exactly one `ToolExecution` row keyed to the
    /// response's public id, same as the synchronous path.
    #[tokio::test]
    async fn worker_persists_tool_executions_for_a_tool_calling_response() {
        use wiremock::matchers::method;
        use wiremock::{Mock, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "content": [{"type": "text", "text": "{\"hits\": 1}"}],
                    "isError": false,
                }
            })))
            .mount(&server)
            .await;

        let store = Arc::new(SqliteResponseStore::open_in_memory().unwrap());
        store.insert(&sample_response("resp_2")).await.unwrap();

        let client = reqwest::Client::new();
        let tool_loop = Arc::new(ToolLoop::new(
            Arc::new(CallsToolThenStopsLlm {
                turn: std::sync::atomic::AtomicU32::new(0),
            }),
            Arc::new(crate::mcp_client::McpClient::new(client.clone(), server.uri())),
            Arc::new(crate::conversation_client::ConversationClient::new(client.clone(), server.uri())),
            Arc::new(jan_mcp_bridge::WriteBackClient::new(server.uri())),
            Arc::new(NeverResolves),
            Arc::new(jan_config::Settings::default()),
            Arc::clone(&store),
        ));
        let webhook = Arc::new(WebhookSender::new(client));
        let pool = Arc::new(BackgroundWorkerPool::new(
            Arc::clone(&store),
            tool_loop,
            webhook,
            WorkerPoolConfig { worker_count: 1 },
        ));

        let cancellation = CancellationToken::new();
        let handles = pool.spawn(cancellation.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancellation.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        let updated = store.get("resp_2").await.unwrap().unwrap();
        assert_eq!(updated.status, ResponseStatus::Completed);

        let persisted = store.list_tool_executions("resp_2").await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].call_id, "c1");
    }
}
