//! `memory_retrieve` tool: forwards a memory lookup to the memory service
//! (spec §4.2.3). `user_id` is required; `project_id`/`conversation_id` scope
//! the retrieval when present.

use std::sync::Arc;

use async_trait::async_trait;
use jan_core::JanResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider_client::ProviderClient;
use crate::registry::{Tool, ToolSpec};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct MemoryRetrieveArgs {
    pub user_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub options: Option<Value>,
}

pub struct MemoryRetrieveTool {
    client: Arc<ProviderClient>,
}

impl MemoryRetrieveTool {
    pub fn new(client: Arc<ProviderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for MemoryRetrieveTool {
    fn name(&self) -> &str {
        "memory_retrieve"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Retrieve relevant memories for a user/project/conversation.".to_string(),
            input_schema: super::schema_for::<MemoryRetrieveArgs>(),
        }
    }

    async fn call(&self, arguments: Value) -> JanResult<Value> {
        let args: MemoryRetrieveArgs = serde_json::from_value(arguments)
            .map_err(|e| crate::error::validation(format!("memory_retrieve arguments: {e}")))?;
        self.client
            .post_json("/retrieve", serde_json::to_value(&args).unwrap(), None)
            .await
    }
}
