//! Method guard: only a fixed set of JSON-RPC methods reach dispatch.

/// Methods accepted by `POST /v1/mcp`. Anything else is a validation error
/// before the request is ever dispatched to the registry or a provider.
pub const ALLOWED_METHODS: &[&str] = &[
    "initialize",
    "notifications/initialized",
    "ping",
    "tools/list",
    "tools/call",
    "prompts/list",
    "prompts/call",
    "resources/list",
    "resources/templates/list",
    "resources/read",
    "resources/subscribe",
];

pub fn is_allowed(method: &str) -> bool {
    ALLOWED_METHODS.contains(&method)
}
