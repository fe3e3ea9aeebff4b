//! `scrape` tool: forwards a URL scrape request (spec §4.2.3). Uses the
//! provider's longer `scrape_timeout` (default 30s) rather than the default
//! `http_timeout` (15s).

use std::sync::Arc;

use async_trait::async_trait;
use jan_core::JanResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider_client::ProviderClient;
use crate::registry::{Tool, ToolSpec};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ScrapeArgs {
    pub url: String,
    #[serde(default, rename = "includeMarkdown")]
    pub include_markdown: Option<bool>,
}

pub struct ScrapeTool {
    client: Arc<ProviderClient>,
    timeout: std::time::Duration,
    max_preview_chars: usize,
}

impl ScrapeTool {
    pub fn new(client: Arc<ProviderClient>, timeout: std::time::Duration, max_preview_chars: usize) -> Self {
        Self {
            client,
            timeout,
            max_preview_chars,
        }
    }
}

#[async_trait]
impl Tool for ScrapeTool {
    fn name(&self) -> &str {
        "scrape"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Scrape a URL and return its text (optionally markdown).".to_string(),
            input_schema: super::schema_for::<ScrapeArgs>(),
        }
    }

    async fn call(&self, arguments: Value) -> JanResult<Value> {
        let args: ScrapeArgs = serde_json::from_value(arguments)
            .map_err(|e| crate::error::validation(format!("scrape arguments: {e}")))?;
        let mut result = self
            .client
            .post_json("/scrape", serde_json::to_value(&args).unwrap(), Some(self.timeout))
            .await?;
        if let Some(text) = result.get("text").and_then(|v| v.as_str()) {
            let truncated = jan_agent::truncate_tool_result(text, self.max_preview_chars);
            if let Some(obj) = result.as_object_mut() {
                obj.insert("text".to_string(), Value::String(truncated));
            }
        }
        Ok(result)
    }
}
