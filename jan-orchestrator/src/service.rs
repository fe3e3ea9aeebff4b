//! The five public operations over `Response` (spec §4.1.1) and the three
//! execution-mode dispatch (spec §4.1.2). `jan-server`'s HTTP handlers are
//! thin wrappers around this service: it owns the store, the tool loop, the
//! webhook sender, and the in-flight cancellation registry.

use std::collections::HashMap;
use std::sync::Arc;

use jan_agent::{Message, MessageChunk};
use jan_core::JanResult;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::conversation_client::ConversationClient;
use crate::model::{Response, ResponseError, ResponseStatus};
use crate::store::SqliteResponseStore;
use crate::tool_loop::{LoopOutcomeKind, ToolLoop, ToolLoopContext};
use crate::webhook::WebhookSender;
use jan_media::MediaResolver;

/// Inbound shape of `POST /v1/responses` (spec §4.1.1 "Create").
pub struct CreateRequest {
    pub user_id: String,
    pub authorization: String,
    pub model: String,
    pub provider_id: String,
    pub input: Value,
    pub system_prompt: Option<String>,
    pub stream: bool,
    pub background: bool,
    pub store: bool,
    pub metadata: Value,
    pub conversation_id: Option<String>,
    pub previous_response_id: Option<String>,
}

/// What `create` hands back. Synchronous and background creates resolve
/// immediately to a snapshot; streaming creates hand back a live channel the
/// caller (jan-server's SSE handler) drains as `data:` lines, finishing with
/// `response.done` once the channel closes.
pub enum ExecutionOutcome {
    Snapshot(Response),
    Streaming {
        initial: Response,
        chunks: mpsc::Receiver<MessageChunk>,
    },
}

pub struct ResponseService {
    store: Arc<SqliteResponseStore>,
    tool_loop: Arc<ToolLoop>,
    conversation: Arc<ConversationClient>,
    webhook: Arc<WebhookSender>,
    media_resolver: Arc<MediaResolver>,
    /// Cancellation tokens for responses currently running synchronous or
    /// streaming execution, keyed by public id, so `cancel()` can interrupt a
    /// request that's still in flight (spec §4.1.2 "Streaming": "client
    /// disconnect propagates via request context").
    inflight: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl ResponseService {
    pub fn new(
        store: Arc<SqliteResponseStore>,
        tool_loop: Arc<ToolLoop>,
        conversation: Arc<ConversationClient>,
        webhook: Arc<WebhookSender>,
        media_resolver: Arc<MediaResolver>,
    ) -> Self {
        Self {
            store,
            tool_loop,
            conversation,
            webhook,
            media_resolver,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn inflight_handle(&self) -> Arc<Mutex<HashMap<String, CancellationToken>>> {
        Arc::clone(&self.inflight)
    }

    pub async fn create(&self, req: CreateRequest) -> JanResult<ExecutionOutcome> {
        if req.model.trim().is_empty() {
            return Err(crate::error::validation("model must not be empty"));
        }
        if req.stream && req.background {
            return Err(crate::error::validation(
                "stream and background are mutually exclusive",
            ));
        }

        let messages = self.build_messages(&req).await?;
        let public_id = jan_core::new_response_id();
        let now = jan_core::now();

        let mut response = Response {
            public_id: public_id.clone(),
            user_id: req.user_id.clone(),
            model: req.model.clone(),
            provider_id: req.provider_id.clone(),
            system_prompt: req.system_prompt.clone(),
            input: req.input.clone(),
            output: None,
            status: ResponseStatus::Queued,
            stream: req.stream,
            background: req.background,
            store: req.store,
            conversation_id: req.conversation_id.clone(),
            previous_response_id: req.previous_response_id.clone(),
            metadata: req.metadata.clone(),
            usage: None,
            error: None,
            queued_at: if req.background { Some(now) } else { None },
            started_at: if req.background { None } else { Some(now) },
            completed_at: None,
            cancelled_at: None,
            failed_at: None,
            messages,
            authorization: Some(req.authorization.clone()),
        };

        if req.background {
            self.store.insert(&response).await?;
            return Ok(ExecutionOutcome::Snapshot(response));
        }

        response.status = ResponseStatus::InProgress;
        if req.store {
            self.store.insert(&response).await?;
        }

        let ctx = ToolLoopContext {
            model: response.model.clone(),
            provider_id: response.provider_id.clone(),
            messages: response.messages.clone(),
            conversation_id: response.conversation_id.clone(),
            authorization: req.authorization.clone(),
            response_id: public_id.clone(),
        };

        let cancellation = CancellationToken::new();
        self.inflight
            .lock()
            .await
            .insert(public_id.clone(), cancellation.clone());

        if req.stream {
            let (chunk_tx, chunk_rx) = mpsc::channel(32);
            let tool_loop = Arc::clone(&self.tool_loop);
            let store = Arc::clone(&self.store);
            let webhook = Arc::clone(&self.webhook);
            let mut response_for_task = response.clone();
            let inflight = self.inflight_handle();
            let public_id_for_task = public_id.clone();

            tokio::spawn(async move {
                let outcome = tokio::select! {
                    result = tool_loop.run_streaming(ctx, chunk_tx) => Some(result),
                    _ = cancellation.cancelled() => None,
                };
                match outcome {
                    Some(Ok(result)) => apply_tool_loop_outcome(&mut response_for_task, result),
                    Some(Err(e)) => {
                        response_for_task.status = ResponseStatus::Failed;
                        response_for_task.failed_at = Some(jan_core::now());
                        response_for_task.error = Some(ResponseError {
                            code: "upstream_unavailable".to_string(),
                            message: e.message,
                        });
                    }
                    None => {
                        response_for_task.status = ResponseStatus::Cancelled;
                        response_for_task.cancelled_at = Some(jan_core::now());
                    }
                }
                inflight.lock().await.remove(&public_id_for_task);
                if response_for_task.store {
                    let _ = store.update(&response_for_task).await;
                }
                let _ = webhook.notify_terminal(&response_for_task).await;
            });

            return Ok(ExecutionOutcome::Streaming {
                initial: response,
                chunks: chunk_rx,
            });
        }

        let result = tokio::select! {
            result = self.tool_loop.run(ctx) => Some(result),
            _ = cancellation.cancelled() => None,
        };
        self.inflight.lock().await.remove(&public_id);

        match result {
            Some(Ok(loop_result)) => apply_tool_loop_outcome(&mut response, loop_result),
            Some(Err(e)) => {
                response.status = ResponseStatus::Failed;
                response.failed_at = Some(jan_core::now());
                response.error = Some(ResponseError {
                    code: "upstream_unavailable".to_string(),
                    message: e.message,
                });
            }
            None => {
                response.status = ResponseStatus::Cancelled;
                response.cancelled_at = Some(jan_core::now());
            }
        }

        if req.store {
            self.store.update(&response).await?;
        }
        let _ = self.webhook.notify_terminal(&response).await;
        Ok(ExecutionOutcome::Snapshot(response))
    }

    pub async fn get(&self, public_id: &str, user_id: &str) -> JanResult<Response> {
        let response = self.load_owned(public_id, user_id).await?;
        Ok(response)
    }

    /// spec §4.1.1 "Cancel": not-found, forbidden, conflict (already terminal).
    pub async fn cancel(&self, public_id: &str, user_id: &str) -> JanResult<Response> {
        let mut response = self.load_owned(public_id, user_id).await?;
        if response.status.is_terminal() {
            return Err(crate::error::conflict(format!(
                "response {public_id} is already in a terminal state"
            )));
        }

        if let Some(token) = self.inflight.lock().await.remove(public_id) {
            token.cancel();
        }

        response.status = ResponseStatus::Cancelled;
        response.cancelled_at = Some(jan_core::now());
        self.store.update(&response).await?;
        Ok(response)
    }

    pub async fn delete(&self, public_id: &str, user_id: &str) -> JanResult<()> {
        self.load_owned(public_id, user_id).await?;
        self.store.delete(public_id).await
    }

    /// spec §4.1.1 "ListInputItems": ordered echo of resolved input parts.
    /// Pagination is a plain offset cursor over the resolved parts list; there
    /// is no further resolution work once `input` has already been normalized
    /// into a JSON array at create time.
    pub async fn list_input_items(
        &self,
        public_id: &str,
        user_id: &str,
        cursor: usize,
        limit: usize,
    ) -> JanResult<Vec<Value>> {
        let response = self.load_owned(public_id, user_id).await?;
        let items = match &response.input {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        };
        Ok(items.into_iter().skip(cursor).take(limit).collect())
    }

    async fn load_owned(&self, public_id: &str, user_id: &str) -> JanResult<Response> {
        let response = self
            .store
            .get(public_id)
            .await?
            .ok_or_else(|| crate::error::not_found(format!("response {public_id} not found")))?;
        if response.user_id != user_id {
            return Err(crate::error::forbidden(format!(
                "response {public_id} does not belong to caller"
            )));
        }
        Ok(response)
    }

    /// `messages = system? ++ history(previous_response_id or conversation) ++
    /// resolveMedia(input)` (spec §4.1.3). Placeholder resolution runs last,
    /// over the whole assembled batch, so media referenced anywhere in
    /// history or in `input` is expanded before it crosses the LLM boundary
    /// (spec §4.4.1: "just-in-time before they cross the LLM boundary").
    async fn build_messages(&self, req: &CreateRequest) -> JanResult<Vec<Message>> {
        let mut messages = Vec::new();
        if let Some(system_prompt) = &req.system_prompt {
            messages.push(Message::system(system_prompt.clone()));
        }

        if let Some(previous_response_id) = &req.previous_response_id {
            if let Some(previous) = self.store.get(previous_response_id).await? {
                if previous.user_id == req.user_id {
                    messages.extend(previous.messages);
                }
            }
        } else if let Some(conversation_id) = &req.conversation_id {
            let history = self
                .conversation
                .fetch_history(conversation_id, &req.authorization)
                .await?;
            messages.extend(history);
        }

        match &req.input {
            Value::String(text) => messages.push(Message::user(text.clone())),
            Value::Null => {}
            other => messages.push(Message::user(other.to_string())),
        }

        self.media_resolver
            .resolve(messages, &req.authorization)
            .await
    }
}

fn apply_tool_loop_outcome(response: &mut Response, result: crate::tool_loop::ToolLoopResult) {
    response.output = Some(result.output);
    response.usage = result.usage;
    response.messages = result.messages;
    response.status = ResponseStatus::Completed;
    response.completed_at = Some(jan_core::now());
    if result.kind == LoopOutcomeKind::DepthExceeded {
        response.error = Some(ResponseError {
            code: "max_tool_depth_exceeded".to_string(),
            message: "tool loop reached its maximum depth before finishing".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jan_agent::{AgentError, FinishReason, LlmClient, LlmResponse, ToolChoiceMode};
    use model_spec_core::{ModelLimitResolver, ModelSpec};
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
                content: "hello there".to_string(),
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

    fn test_service(server_uri: String) -> ResponseService {
        test_service_with_llm(server_uri, Arc::new(ImmediateStopLlm)).0
    }

    fn test_service_with_llm(
        server_uri: String,
        llm: Arc<dyn LlmClient>,
    ) -> (ResponseService, Arc<SqliteResponseStore>) {
        let client = reqwest::Client::new();
        let store = Arc::new(SqliteResponseStore::open_in_memory().unwrap());
        let tool_loop = Arc::new(ToolLoop::new(
            llm,
            Arc::new(crate::mcp_client::McpClient::new(client.clone(), server_uri.clone())),
            Arc::new(ConversationClient::new(client.clone(), server_uri.clone())),
            Arc::new(jan_mcp_bridge::WriteBackClient::new(server_uri.clone())),
            Arc::new(NeverResolves),
            Arc::new(jan_config::Settings::default()),
            Arc::clone(&store),
        ));
        let conversation = Arc::new(ConversationClient::new(client.clone(), server_uri));
        let webhook = Arc::new(WebhookSender::new(client.clone()));
        let media_resolver = Arc::new(MediaResolver::new(client, None, std::time::Duration::from_secs(5)));
        let service = ResponseService::new(
            Arc::clone(&store),
            tool_loop,
            conversation,
            webhook,
            media_resolver,
        );
        (service, store)
    }

    fn base_request() -> CreateRequest {
        CreateRequest {
            user_id: "u1".to_string(),
            authorization: "Bearer token".to_string(),
            model: "gpt-test".to_string(),
            provider_id: "jan".to_string(),
            input: Value::String("hi there".to_string()),
            system_prompt: None,
            stream: false,
            background: false,
            store: true,
            metadata: Value::Null,
            conversation_id: None,
            previous_response_id: None,
        }
    }

    #[tokio::test]
    async fn synchronous_create_returns_completed_snapshot() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let outcome = service.create(base_request()).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };
        assert_eq!(response.status, ResponseStatus::Completed);
        assert_eq!(response.output.as_deref(), Some("hello there"));
    }

    #[tokio::test]
    async fn background_create_queues_without_running_the_loop() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let mut req = base_request();
        req.background = true;
        req.stream = false;

        let outcome = service.create(req).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a queued snapshot");
        };
        assert_eq!(response.status, ResponseStatus::Queued);
        assert!(response.queued_at.is_some());
    }

    #[tokio::test]
    async fn stream_and_background_together_is_a_validation_error() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let mut req = base_request();
        req.stream = true;
        req.background = true;

        let err = service.create(req).await.unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn get_enforces_ownership() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let outcome = service.create(base_request()).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };

        let err = service
            .get(&response.public_id, "someone-else")
            .await
            .unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::Forbidden);

        let fetched = service.get(&response.public_id, "u1").await.unwrap();
        assert_eq!(fetched.public_id, response.public_id);
    }

    #[tokio::test]
    async fn cancel_rejects_already_terminal_response() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let outcome = service.create(base_request()).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };

        let err = service
            .cancel(&response.public_id, "u1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn delete_removes_a_stored_response() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let outcome = service.create(base_request()).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };

        service.delete(&response.public_id, "u1").await.unwrap();
        let err = service.get(&response.public_id, "u1").await.unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_input_items_paginates_array_input() {
        let server = MockServer::start().await;
        let service = test_service(server.uri());

        let mut req = base_request();
        req.input = serde_json::json!(["part-a", "part-b", "part-c"]);

        let outcome = service.create(req).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };

        let page = service
            .list_input_items(&response.public_id, "u1", 1, 1)
            .await
            .unwrap();
        assert_eq!(page, vec![Value::String("part-b".to_string())]);
    }

    /// spec §8.4.1 / §8.1: a response whose tool loop surfaces one tool call
    /// persists exactly one `ToolExecution` row, reachable through the same
    /// store the service itself uses.
    #[tokio::test]
    async fn synchronous_create_persists_tool_executions() {
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

        let (service, store) = test_service_with_llm(
            server.uri(),
            Arc::new(CallsToolThenStopsLlm {
                turn: std::sync::atomic::AtomicU32::new(0),
            }),
        );

        let outcome = service.create(base_request()).await.unwrap();
        let ExecutionOutcome::Snapshot(response) = outcome else {
            panic!("expected a synchronous snapshot");
        };
        assert_eq!(response.status, ResponseStatus::Completed);
        assert_eq!(response.output.as_deref(), Some("found it"));

        let persisted = store.list_tool_executions(&response.public_id).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].call_id, "c1");
        assert_eq!(persisted[0].status, crate::model::ToolExecutionStatus::Success);
    }
}
