//! `python_exec` tool: forwards code to the sandbox provider (spec §4.2.3).
//!
//! When `sandbox_require_approval=true`, the call is not forwarded at all;
//! instead an approval-required envelope is returned to the model so it can
//! surface the pending approval rather than silently executing code.

use std::sync::Arc;

use async_trait::async_trait;
use jan_core::JanResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider_client::ProviderClient;
use crate::registry::{Tool, ToolSpec};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct PythonExecArgs {
    pub code: String,
    #[serde(default)]
    pub timeout_seconds: Option<u32>,
}

pub struct PythonExecTool {
    client: Arc<ProviderClient>,
    require_approval: bool,
}

impl PythonExecTool {
    pub fn new(client: Arc<ProviderClient>, require_approval: bool) -> Self {
        Self {
            client,
            require_approval,
        }
    }
}

#[async_trait]
impl Tool for PythonExecTool {
    fn name(&self) -> &str {
        "python_exec"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: "Execute Python code in a sandbox and return stdout/stderr.".to_string(),
            input_schema: super::schema_for::<PythonExecArgs>(),
        }
    }

    async fn call(&self, arguments: Value) -> JanResult<Value> {
        let args: PythonExecArgs = serde_json::from_value(arguments)
            .map_err(|e| crate::error::validation(format!("python_exec arguments: {e}")))?;

        if self.require_approval {
            return Ok(serde_json::json!({
                "status": "approval_required",
                "code": args.code,
            }));
        }

        self.client
            .post_json("/execute", serde_json::to_value(&args).unwrap(), None)
            .await
    }
}
