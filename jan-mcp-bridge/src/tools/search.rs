//! `google_search` tool: forwards to the search provider (spec §4.2.3).

use std::sync::Arc;

use async_trait::async_trait;
use jan_core::JanResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider_client::ProviderClient;
use crate::registry::{Tool, ToolSpec};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GoogleSearchArgs {
    /// Search query.
    pub q: String,
    /// Country code, e.g. "us".
    #[serde(default)]
    pub gl: Option<String>,
    /// Language code, e.g. "en".
    #[serde(default)]
    pub hl: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub num: Option<u32>,
    /// Serper `tbs` time filter, e.g. "qdr:w".
    #[serde(default)]
    pub tbs: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub autocorrect: Option<bool>,
}

pub struct GoogleSearchTool {
    client: Arc<ProviderClient>,
}

impl GoogleSearchTool {
    pub fn new(client: Arc<ProviderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Search the web via Google (Serper-compatible).".to_string(),
            input_schema: super::schema_for::<GoogleSearchArgs>(),
        }
    }

    async fn call(&self, arguments: Value) -> JanResult<Value> {
        let args: GoogleSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| crate::error::validation(format!("google_search arguments: {e}")))?;
        self.client
            .post_json("/search", serde_json::to_value(args).unwrap(), None)
            .await
    }
}
