//! Tool registry (spec §4.2.3): each tool advertises a name, description, and a
//! JSON schema generated by reflection over a typed argument struct (`schemars`
//! stands in for the Go `json`/`jsonschema` struct-tag reflection the source
//! system uses — see SPEC_FULL.md §0, "jan-mcp-bridge").
//!
//! Tools may be individually disabled by config; a disabled tool is absent from
//! `tools/list` and `tools/call` against it fails with `NotImplemented`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jan_core::JanResult;
use serde_json::Value;

/// Advertised shape of a tool, mirroring an MCP `tools/list` entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One callable tool. Implementations either forward to an external MCP
/// provider session ([`crate::session::ProviderSession`]) or call a bespoke
/// HTTP provider directly (spec §4.2.3 table).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn spec(&self) -> ToolSpec;
    async fn call(&self, arguments: Value) -> JanResult<Value>;
}

/// Enumerates and dispatches the registered tools. Disabled tools (by name) are
/// filtered from `list()` and rejected by `call()`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    disabled: std::collections::HashSet<String>,
}

impl ToolRegistry {
    pub fn new(disabled: impl IntoIterator<Item = String>) -> Self {
        Self {
            tools: HashMap::new(),
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .filter(|t| self.is_enabled(t.name()))
            .map(|t| t.spec())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub async fn call(&self, name: &str, arguments: Value) -> JanResult<Value> {
        if !self.is_enabled(name) {
            return Err(crate::error::not_implemented(format!(
                "tool '{name}' is disabled"
            )));
        }
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| crate::error::not_found(format!("unknown tool '{name}'")))?;
        tool.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".to_string(),
                description: "echoes input".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn call(&self, arguments: Value) -> JanResult<Value> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn disabled_tool_is_hidden_from_list_and_rejects_calls() {
        let mut registry = ToolRegistry::new(["echo".to_string()]);
        registry.register(Arc::new(EchoTool));

        assert!(registry.list().is_empty());
        let err = registry.call("echo", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::NotImplemented);
    }

    #[tokio::test]
    async fn enabled_tool_lists_and_calls() {
        let mut registry = ToolRegistry::new([]);
        registry.register(Arc::new(EchoTool));

        let specs = registry.list();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");

        let result = registry.call("echo", serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new([]);
        let err = registry.call("nope", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::NotFound);
    }
}
