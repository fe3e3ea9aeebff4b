//! Concrete tools registered by the bridge (spec §4.2.3 table).
//!
//! Each tool's argument struct derives `schemars::JsonSchema` so its
//! `tools/list` entry is generated from the struct shape rather than
//! hand-written, the Rust equivalent of the source system's field-tag
//! reflection (spec §9 "Dynamic tool dispatch").

mod memory_retrieve;
mod python_exec;
mod scrape;
mod search;

pub use memory_retrieve::MemoryRetrieveTool;
pub use python_exec::PythonExecTool;
pub use scrape::ScrapeTool;
pub use search::GoogleSearchTool;

pub(crate) fn schema_for<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(serde_json::json!({"type": "object"}))
}
