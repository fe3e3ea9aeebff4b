//! The tool-loop algorithm (spec §4.1.3): the core of the response
//! orchestrator, shared by the synchronous, streaming, and background
//! execution modes. Each mode builds a [`ToolLoopContext`] and drives
//! [`ToolLoop::run`] to completion (or to `MaxToolDepth`).

use std::sync::Arc;

use jan_agent::{LlmClient, LlmUsage, Message, ToolChoiceMode};
use jan_config::Settings;
use jan_core::JanResult;
use model_spec_core::{ModelLimitResolver, ModelSpec};
use serde_json::Value;

use crate::conversation_client::ConversationClient;
use crate::mcp_client::McpClient;
use crate::model::{ToolExecution, ToolExecutionStatus};
use crate::store::SqliteResponseStore;

/// What one turn of the loop needs: the model, provider id (for catalog
/// lookup), the running message list, and conversation/auth context for
/// placeholder creation and write-back. `response_id` stamps every
/// `ToolExecution` persisted during this run (spec §3.2).
pub struct ToolLoopContext {
    pub model: String,
    pub provider_id: String,
    pub messages: Vec<Message>,
    pub conversation_id: Option<String>,
    pub authorization: String,
    pub response_id: String,
}

/// How the loop terminated (spec §4.1.3 step 3/5, §4.1.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcomeKind {
    /// Finish reason was `stop`/`end_turn`.
    Stopped,
    /// `depth` exceeded `MaxToolDepth`; still `completed`, with a diagnostic error.
    DepthExceeded,
}

pub struct ToolLoopResult {
    pub kind: LoopOutcomeKind,
    pub output: String,
    pub usage: Option<LlmUsage>,
    pub messages: Vec<Message>,
    pub tool_executions: Vec<ToolExecution>,
}

pub struct ToolLoop {
    llm: Arc<dyn LlmClient>,
    mcp: Arc<McpClient>,
    conversation: Arc<ConversationClient>,
    writeback: Arc<jan_mcp_bridge::WriteBackClient>,
    catalog: Arc<dyn ModelLimitResolver>,
    settings: Arc<Settings>,
    store: Arc<SqliteResponseStore>,
}

impl ToolLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        mcp: Arc<McpClient>,
        conversation: Arc<ConversationClient>,
        writeback: Arc<jan_mcp_bridge::WriteBackClient>,
        catalog: Arc<dyn ModelLimitResolver>,
        settings: Arc<Settings>,
        store: Arc<SqliteResponseStore>,
    ) -> Self {
        Self {
            llm,
            mcp,
            conversation,
            writeback,
            catalog,
            settings,
            store,
        }
    }

    /// Runs the loop to completion. Returns `Err` only for upstream
    /// chat-completions failure (spec §4.1.5: entire response fails); tool
    /// failures are recoverable and folded into the message list instead.
    pub async fn run(&self, ctx: ToolLoopContext) -> JanResult<ToolLoopResult> {
        self.run_inner(ctx, None).await
    }

    /// Streaming variant (spec §4.1.2 "Streaming"): identical algorithm, but
    /// each turn's content is forwarded through `chunk_tx` as it arrives so
    /// the caller can emit SSE `data:` lines live instead of waiting for the
    /// whole loop to finish.
    pub async fn run_streaming(
        &self,
        ctx: ToolLoopContext,
        chunk_tx: tokio::sync::mpsc::Sender<jan_agent::MessageChunk>,
    ) -> JanResult<ToolLoopResult> {
        self.run_inner(ctx, Some(chunk_tx)).await
    }

    async fn run_inner(
        &self,
        mut ctx: ToolLoopContext,
        chunk_tx: Option<tokio::sync::mpsc::Sender<jan_agent::MessageChunk>>,
    ) -> JanResult<ToolLoopResult> {
        let spec = self
            .catalog
            .resolve(&ctx.provider_id, &ctx.model)
            .await
            .unwrap_or_else(ModelSpec::fallback_default);
        let budget = jan_agent::token_budget(spec.context_limit as usize);

        let tools = self.mcp.list_tools().await.unwrap_or_default();
        let mut tool_executions = Vec::new();
        let mut depth: u32 = 0;

        loop {
            jan_agent::trim_to_budget(&mut ctx.messages, budget);

            let response = tokio::time::timeout(
                self.settings.tool_execution_timeout,
                self.llm
                    .invoke_stream(&ctx.messages, &tools, ToolChoiceMode::Auto, chunk_tx.clone()),
            )
            .await
            .map_err(|_| crate::error::upstream_unavailable("chat completions call timed out"))?
            .map_err(|e| crate::error::upstream_unavailable(e.to_string()))?;

            if response.tool_calls.is_empty() {
                return Ok(ToolLoopResult {
                    kind: LoopOutcomeKind::Stopped,
                    output: response.content,
                    usage: response.usage,
                    messages: ctx.messages,
                    tool_executions,
                });
            }

            if depth >= self.settings.max_tool_execution_depth {
                let apology = "I wasn't able to finish within the allotted tool-call budget, \
                    so here is my best partial answer based on what I found so far."
                    .to_string();
                return Ok(ToolLoopResult {
                    kind: LoopOutcomeKind::DepthExceeded,
                    output: apology,
                    usage: None,
                    messages: ctx.messages,
                    tool_executions,
                });
            }

            ctx.messages
                .push(Message::assistant_tool_calls(response.tool_calls.clone()));

            for (order, call) in response.tool_calls.iter().enumerate() {
                let arguments: Value =
                    serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
                let started_at = jan_core::now();

                if let Some(conversation_id) = ctx.conversation_id.as_deref() {
                    if let Err(e) = self
                        .conversation
                        .create_mcp_call_placeholder(
                            conversation_id,
                            &ctx.authorization,
                            &call.id,
                            &call.name,
                            &arguments,
                        )
                        .await
                    {
                        tracing::warn!(error = %e, call_id = %call.id, "placeholder item creation failed");
                    }
                }

                let outcome = tokio::time::timeout(
                    self.settings.tool_execution_timeout,
                    self.mcp.call_tool(&call.name, arguments.clone()),
                )
                .await;

                let (status, result_json, error_message) = match outcome {
                    Ok(Ok(result)) => (ToolExecutionStatus::Success, Some(result), None),
                    Ok(Err(e)) => (ToolExecutionStatus::Failed, None, Some(e.message)),
                    Err(_) => (
                        ToolExecutionStatus::Failed,
                        None,
                        Some("tool call timed out".to_string()),
                    ),
                };
                let completed_at = jan_core::now();

                if let Some(conversation_id) = ctx.conversation_id.as_deref() {
                    let (wb_status, output, error) = match &status {
                        ToolExecutionStatus::Success => {
                            ("completed", result_json.clone(), None)
                        }
                        ToolExecutionStatus::Failed => (
                            "failed",
                            None,
                            Some(serde_json::json!({"message": error_message.clone()})),
                        ),
                    };
                    if let Err(e) = self
                        .writeback
                        .patch_by_call_id(
                            conversation_id,
                            &call.id,
                            &ctx.authorization,
                            jan_mcp_bridge::WriteBackRequest {
                                status: wb_status,
                                output,
                                error,
                                name: &call.name,
                                arguments: &arguments,
                                server_label: None,
                            },
                        )
                        .await
                    {
                        tracing::warn!(error = %e, call_id = %call.id, "write-back failed");
                    }
                }

                let tool_message_content = match &result_json {
                    Some(v) => v.clone(),
                    None => serde_json::json!({"error": error_message.clone().unwrap_or_default()}),
                };
                let truncated = jan_agent::truncate_tool_result(
                    &tool_message_content.to_string(),
                    self.settings.mcp_truncation.max_scrape_text_chars,
                );
                ctx.messages.push(Message::tool_result(
                    call.id.clone(),
                    serde_json::Value::String(truncated),
                ));

                let exec = ToolExecution {
                    response_id: ctx.response_id.clone(),
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments,
                    result: result_json,
                    status,
                    error_message,
                    execution_order: (tool_executions.len() + order) as u32,
                    started_at,
                    completed_at,
                };
                if let Err(e) = self.store.insert_tool_execution(&exec).await {
                    tracing::warn!(error = %e, call_id = %exec.call_id, "tool execution persistence failed");
                }
                tool_executions.push(exec);
            }

            depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jan_agent::{AgentError, FinishReason, LlmResponse, ToolCall};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct ScriptedLlm {
        turn: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[Value],
            _tool_choice: ToolChoiceMode,
        ) -> Result<LlmResponse, AgentError> {
            let turn = self.turn.fetch_add(1, Ordering::SeqCst);
            if turn == 0 {
                Ok(LlmResponse {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "search".to_string(),
                        arguments: "{\"q\": \"rust\"}".to_string(),
                    }],
                    finish_reason: FinishReason::ToolCalls,
                    usage: None,
                })
            } else {
                Ok(LlmResponse {
                    content: "final answer".to_string(),
                    tool_calls: vec![],
                    finish_reason: FinishReason::Stop,
                    usage: Some(LlmUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                })
            }
        }
    }

    #[derive(Default)]
    struct AlwaysCallsToolsLlm {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for AlwaysCallsToolsLlm {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[Value],
            _tool_choice: ToolChoiceMode,
        ) -> Result<LlmResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    id: format!("call_{}", self.calls.load(Ordering::SeqCst)),
                    name: "search".to_string(),
                    arguments: "{}".to_string(),
                }],
                finish_reason: FinishReason::ToolCalls,
                usage: None,
            })
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl ModelLimitResolver for NeverResolves {
        async fn resolve(&self, _provider_id: &str, _model_id: &str) -> Option<ModelSpec> {
            None
        }
    }

    fn test_loop(llm: Arc<dyn LlmClient>, server_uri: String) -> (ToolLoop, Arc<SqliteResponseStore>) {
        test_loop_with_settings(
            llm,
            server_uri,
            Settings {
                tool_execution_timeout: Duration::from_secs(5),
                max_tool_execution_depth: 8,
                ..Settings::default()
            },
        )
    }

    fn test_loop_with_settings(
        llm: Arc<dyn LlmClient>,
        server_uri: String,
        settings: Settings,
    ) -> (ToolLoop, Arc<SqliteResponseStore>) {
        let client = reqwest::Client::new();
        let store = Arc::new(SqliteResponseStore::open_in_memory().unwrap());
        let tool_loop = ToolLoop::new(
            llm,
            Arc::new(McpClient::new(client.clone(), server_uri.clone())),
            Arc::new(ConversationClient::new(client.clone(), server_uri.clone())),
            Arc::new(jan_mcp_bridge::WriteBackClient::new(server_uri)),
            Arc::new(NeverResolves),
            Arc::new(settings),
            Arc::clone(&store),
        );
        (tool_loop, store)
    }

    #[tokio::test]
    async fn stops_on_stop_finish_reason_after_one_tool_round() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

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

        let (tool_loop, store) = test_loop(
            Arc::new(ScriptedLlm {
                turn: AtomicU32::new(0),
            }),
            server.uri(),
        );

        let result = tool_loop
            .run(ToolLoopContext {
                model: "gpt-test".to_string(),
                provider_id: "jan".to_string(),
                messages: vec![Message::system("sys"), Message::user("find something")],
                conversation_id: None,
                authorization: "Bearer token".to_string(),
                response_id: "resp_1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.kind, LoopOutcomeKind::Stopped);
        assert_eq!(result.output, "final answer");
        assert_eq!(result.tool_executions.len(), 1);
        assert_eq!(result.tool_executions[0].status, ToolExecutionStatus::Success);

        let persisted = store.list_tool_executions("resp_1").await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].call_id, "call_1");
        assert_eq!(persisted[0].status, ToolExecutionStatus::Success);
    }

    /// spec §8.3: `MaxToolDepth = 0` means the first assistant turn with a
    /// `tool_calls` finish reason immediately completes with
    /// `max_tool_depth_exceeded` — no tool is ever dispatched.
    #[tokio::test]
    async fn max_tool_depth_zero_completes_before_executing_any_tool() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "content": [{"type": "text", "text": "{}"}],
                    "isError": false,
                }
            })))
            .mount(&server)
            .await;

        let llm = Arc::new(AlwaysCallsToolsLlm::default());
        let (tool_loop, store) = test_loop_with_settings(
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            server.uri(),
            Settings {
                max_tool_execution_depth: 0,
                tool_execution_timeout: Duration::from_secs(5),
                ..Settings::default()
            },
        );

        let result = tool_loop
            .run(ToolLoopContext {
                model: "gpt-test".to_string(),
                provider_id: "jan".to_string(),
                messages: vec![Message::system("sys"), Message::user("loop forever")],
                conversation_id: None,
                authorization: "Bearer token".to_string(),
                response_id: "resp_depth0".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.kind, LoopOutcomeKind::DepthExceeded);
        assert!(!result.output.is_empty());
        assert_eq!(result.tool_executions.len(), 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert!(store
            .list_tool_executions("resp_depth0")
            .await
            .unwrap()
            .is_empty());
    }

    /// spec §8.4.2: with `MaxToolDepth = 3`, exactly 4 upstream calls happen
    /// and exactly 3 tool rounds execute before the loop force-finishes.
    #[tokio::test]
    async fn max_tool_depth_three_executes_exactly_three_rounds_across_four_calls() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "content": [{"type": "text", "text": "{}"}],
                    "isError": false,
                }
            })))
            .mount(&server)
            .await;

        let llm = Arc::new(AlwaysCallsToolsLlm::default());
        let (tool_loop, store) = test_loop_with_settings(
            Arc::clone(&llm) as Arc<dyn LlmClient>,
            server.uri(),
            Settings {
                max_tool_execution_depth: 3,
                tool_execution_timeout: Duration::from_secs(5),
                ..Settings::default()
            },
        );

        let result = tool_loop
            .run(ToolLoopContext {
                model: "gpt-test".to_string(),
                provider_id: "jan".to_string(),
                messages: vec![Message::system("sys"), Message::user("loop forever")],
                conversation_id: None,
                authorization: "Bearer token".to_string(),
                response_id: "resp_depth3".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.kind, LoopOutcomeKind::DepthExceeded);
        assert_eq!(result.tool_executions.len(), 3);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            store.list_tool_executions("resp_depth3").await.unwrap().len(),
            3
        );
    }
}
