//! OpenAI-compatible Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Talks to the upstream LLM-API (spec §1: "an upstream chat-completions
//! endpoint"). `OPENAI_API_KEY`/`OPENAI_BASE_URL` select the endpoint; tools are
//! passed in per-call as raw JSON-schema function specs (the MCP bridge owns the
//! tool registry, so this client stays agnostic of where tool specs come from).
//!
//! # Streaming
//!
//! Implements `invoke_stream()` for token-by-token streaming, accumulating
//! tool-call deltas by index the way the OpenAI streaming API emits them.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, trace};
use uuid::Uuid;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCalls, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestToolMessage, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionTools,
        CreateChatCompletionRequestArgs, FunctionObject, ToolChoiceOptions,
    },
    Client,
};

use crate::error::AgentError;
use crate::llm::{FinishReason, LlmClient, LlmResponse, LlmUsage, ToolCall, ToolChoiceMode};
use crate::message::{Message, Role};
use crate::stream::MessageChunk;

/// OpenAI-compatible Chat Completions client.
///
/// Uses `OPENAI_API_KEY` from the environment by default; or provide config via
/// `ChatOpenAI::with_config` to point at a self-hosted or proxy LLM-API base URL.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl ChatOpenAI {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| {
                let text = m.content.clone().unwrap_or_default();
                match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessage::from(text.as_str()),
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage::from(text.as_str()),
                    ),
                    Role::Assistant => ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage::from(text.as_str()),
                    ),
                    Role::Tool => {
                        let call_id = m.tool_call_id.clone().unwrap_or_default();
                        ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                            content: text.into(),
                            tool_call_id: call_id,
                        })
                    }
                }
            })
            .collect()
    }

    fn build_args(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        tool_choice: ToolChoiceMode,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, AgentError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));

        if !tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .filter_map(|spec| {
                    let name = spec.get("name")?.as_str()?.to_string();
                    let description = spec
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(String::from);
                    let parameters = spec.get("input_schema").cloned();
                    Some(ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name,
                            description,
                            parameters,
                            ..Default::default()
                        },
                    }))
                })
                .collect();
            args.tools(chat_tools);

            let opt = match tool_choice {
                ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                ToolChoiceMode::None => ToolChoiceOptions::None,
                ToolChoiceMode::Required => ToolChoiceOptions::Required,
            };
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
        }

        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        args.build()
            .map_err(|e| AgentError::Upstream(format!("request build failed: {e}")))
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        tool_choice: ToolChoiceMode,
    ) -> Result<LlmResponse, AgentError> {
        let trace_id = Uuid::new_v4();
        let request = self.build_args(messages, tools, tool_choice)?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            tools_count = tools.len(),
            "chat completion request"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        trace!(trace_id = %trace_id, "chat completion response received");

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::MalformedResponse("no choices in response".to_string()))?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| {
                if let ChatCompletionMessageToolCalls::Function(f) = tc {
                    Some(ToolCall {
                        id: f.id,
                        name: f.function.name,
                        arguments: f.function.arguments,
                    })
                } else {
                    None
                }
            })
            .collect();

        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        tool_choice: ToolChoiceMode,
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let Some(chunk_tx) = chunk_tx else {
            return self.invoke(messages, tools, tool_choice).await;
        };

        let trace_id = Uuid::new_v4();
        let mut request = self.build_args(messages, tools, tool_choice)?;
        request.stream = Some(true);

        debug!(trace_id = %trace_id, model = %self.model, "chat completion stream request");

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        let mut full_content = String::new();
        let mut tool_call_map: std::collections::HashMap<u32, (String, String, String)> =
            std::collections::HashMap::new();
        let mut usage: Option<LlmUsage> = None;

        while let Some(result) = stream.next().await {
            let response = result.map_err(|e| AgentError::Upstream(e.to_string()))?;

            if let Some(ref u) = response.usage {
                usage = Some(LlmUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
            }

            for choice in response.choices {
                let delta = &choice.delta;

                if let Some(ref content) = delta.content {
                    if !content.is_empty() {
                        full_content.push_str(content);
                        let _ = chunk_tx
                            .send(MessageChunk {
                                content: content.clone(),
                            })
                            .await;
                    }
                }

                if let Some(ref tool_calls) = delta.tool_calls {
                    for tc in tool_calls {
                        let entry = tool_call_map.entry(tc.index).or_insert_with(|| {
                            (tc.id.clone().unwrap_or_default(), String::new(), String::new())
                        });
                        if let Some(ref id) = tc.id {
                            if !id.is_empty() {
                                entry.0 = id.clone();
                            }
                        }
                        if let Some(ref func) = tc.function {
                            if let Some(ref name) = func.name {
                                entry.1.push_str(name);
                            }
                            if let Some(ref args) = func.arguments {
                                entry.2.push_str(args);
                            }
                        }
                    }
                }
            }
        }

        let mut entries: Vec<(u32, (String, String, String))> = tool_call_map.into_iter().collect();
        entries.sort_by_key(|(index, _)| *index);
        let tool_calls: Vec<ToolCall> = entries
            .into_iter()
            .map(|(_, (id, name, arguments))| ToolCall { id, name, arguments })
            .collect();

        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };

        Ok(LlmResponse {
            content: full_content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}
