//! Typed env-var surface for jan-server (spec.md §6.8). Call [`load_and_apply`](crate::load_and_apply)
//! first so `.env`/XDG values land in the process environment, then [`Settings::from_env`].

use std::time::Duration;

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Circuit breaker + retry + connection pool knobs for one outbound provider (spec.md §4.2.5).
#[derive(Debug, Clone)]
pub struct ProviderResilience {
    pub cb_failure_threshold: u32,
    pub cb_success_threshold: u32,
    pub cb_timeout: Duration,
    pub cb_max_half_open: u32,
    pub http_timeout: Duration,
    pub scrape_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_initial_delay: Duration,
    pub retry_max_delay: Duration,
    pub retry_backoff_factor: f64,
    pub max_conns_per_host: usize,
    pub max_idle_conns: usize,
    pub idle_conn_timeout: Duration,
}

impl Default for ProviderResilience {
    fn default() -> Self {
        Self {
            cb_failure_threshold: 15,
            cb_success_threshold: 5,
            cb_timeout: Duration::from_secs(45),
            cb_max_half_open: 10,
            http_timeout: Duration::from_secs(15),
            scrape_timeout: Duration::from_secs(30),
            retry_max_attempts: 5,
            retry_initial_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(5),
            retry_backoff_factor: 1.5,
            max_conns_per_host: 50,
            max_idle_conns: 100,
            idle_conn_timeout: Duration::from_secs(90),
        }
    }
}

impl ProviderResilience {
    /// Reads `SERPER_*` overrides (spec.md §6.8); unset keys keep the default.
    fn from_env_prefixed(prefix: &str) -> Self {
        let d = Self::default();
        Self {
            cb_failure_threshold: env_u32(&format!("{prefix}_CB_FAILURE_THRESHOLD"), d.cb_failure_threshold),
            cb_success_threshold: env_u32(&format!("{prefix}_CB_SUCCESS_THRESHOLD"), d.cb_success_threshold),
            cb_timeout: env_duration_secs(&format!("{prefix}_CB_TIMEOUT"), d.cb_timeout),
            cb_max_half_open: env_u32(&format!("{prefix}_CB_MAX_HALF_OPEN"), d.cb_max_half_open),
            http_timeout: env_duration_secs(&format!("{prefix}_HTTP_TIMEOUT"), d.http_timeout),
            scrape_timeout: env_duration_secs(&format!("{prefix}_SCRAPE_TIMEOUT"), d.scrape_timeout),
            retry_max_attempts: env_u32(&format!("{prefix}_RETRY_MAX_ATTEMPTS"), d.retry_max_attempts),
            retry_initial_delay: Duration::from_millis(env_u64(
                &format!("{prefix}_RETRY_INITIAL_DELAY"),
                d.retry_initial_delay.as_millis() as u64,
            )),
            retry_max_delay: Duration::from_millis(env_u64(
                &format!("{prefix}_RETRY_MAX_DELAY"),
                d.retry_max_delay.as_millis() as u64,
            )),
            retry_backoff_factor: std::env::var(format!("{prefix}_RETRY_BACKOFF_FACTOR"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.retry_backoff_factor),
            max_conns_per_host: env_u32(&format!("{prefix}_MAX_CONNS_PER_HOST"), d.max_conns_per_host as u32)
                as usize,
            max_idle_conns: env_u32(&format!("{prefix}_MAX_IDLE_CONNS"), d.max_idle_conns as u32) as usize,
            idle_conn_timeout: env_duration_secs(&format!("{prefix}_IDLE_CONN_TIMEOUT"), d.idle_conn_timeout),
        }
    }
}

/// Truncation limits applied to tool payloads before they cross the LLM boundary (spec.md §6.8, §4.2.3).
#[derive(Debug, Clone)]
pub struct McpTruncation {
    pub max_snippet_chars: usize,
    pub max_scrape_preview_chars: usize,
    pub max_scrape_text_chars: usize,
}

impl Default for McpTruncation {
    fn default() -> Self {
        Self {
            max_snippet_chars: 500,
            max_scrape_preview_chars: 2_000,
            max_scrape_text_chars: 20_000,
        }
    }
}

/// Base URLs/credentials for the external collaborators `jan-server` wires
/// HTTP clients to (spec.md §1.3: "CRUD config... is also read here even
/// though its *consumers* are out of scope"). None of these services are
/// implemented by this workspace; these are only the addresses used to reach
/// them.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    /// Base URL of the external LLM-API's conversation store, used by
    /// `ConversationClient`/`WriteBackClient` (spec.md §6.3, §6.5).
    pub conversation_api_base_url: String,
    /// Base URL of the model-limits catalog (spec.md §4.1.3 step 1).
    pub catalog_base_url: String,
    /// Base URL + bucket of the object store media is PUT to (spec.md §4.4.1).
    pub object_store_base_url: String,
    pub object_store_bucket: String,
    /// SFU (LiveKit) control-plane base URL polled by the reconciler (spec.md §4.3.2).
    pub sfu_base_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
    /// WebSocket URL handed back to realtime session clients (spec.md §6.7).
    pub livekit_ws_url: String,
    /// Search/scrape provider base URL (Serper-compatible, spec.md §4.2.3).
    pub search_provider_base_url: String,
    /// Code-sandbox provider base URL (spec.md §4.2.3 `python_exec`).
    pub sandbox_provider_base_url: String,
    /// Memory-retrieval service base URL (spec.md §4.2.3 `memory_retrieve`).
    pub memory_provider_base_url: String,
    /// On-disk SQLite path for the response store (spec.md §3.2).
    pub response_db_path: String,
    /// On-disk SQLite path for the media object index (spec.md §3.4).
    pub media_db_path: String,
    /// HS256 secret used to validate inbound bearer JWTs. Full JWKS
    /// validation is explicitly out of scope (spec.md §1); only `sub`,
    /// `iss`, and `aud` are checked against this shared secret/issuer/audience.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            conversation_api_base_url: "http://127.0.0.1:8081".to_string(),
            catalog_base_url: "http://127.0.0.1:8081".to_string(),
            object_store_base_url: "http://127.0.0.1:9000".to_string(),
            object_store_bucket: "jan-media".to_string(),
            sfu_base_url: "http://127.0.0.1:7880".to_string(),
            livekit_api_key: String::new(),
            livekit_api_secret: String::new(),
            livekit_ws_url: "wss://127.0.0.1:7880".to_string(),
            search_provider_base_url: "https://google.serper.dev".to_string(),
            sandbox_provider_base_url: "http://127.0.0.1:8082".to_string(),
            memory_provider_base_url: "http://127.0.0.1:8083".to_string(),
            response_db_path: "jan-responses.sqlite3".to_string(),
            media_db_path: "jan-media.sqlite3".to_string(),
            jwt_secret: String::new(),
            jwt_issuer: "jan-server".to_string(),
            jwt_audience: "jan-server".to_string(),
        }
    }
}

impl CollaboratorConfig {
    fn from_env() -> Self {
        let d = Self::default();
        Self {
            conversation_api_base_url: env_string("CONVERSATION_API_BASE_URL", &d.conversation_api_base_url),
            catalog_base_url: env_string("CATALOG_BASE_URL", &d.catalog_base_url),
            object_store_base_url: env_string("OBJECT_STORE_BASE_URL", &d.object_store_base_url),
            object_store_bucket: env_string("OBJECT_STORE_BUCKET", &d.object_store_bucket),
            sfu_base_url: env_string("SFU_BASE_URL", &d.sfu_base_url),
            livekit_api_key: env_string("LIVEKIT_API_KEY", &d.livekit_api_key),
            livekit_api_secret: env_string("LIVEKIT_API_SECRET", &d.livekit_api_secret),
            livekit_ws_url: env_string("LIVEKIT_WS_URL", &d.livekit_ws_url),
            search_provider_base_url: env_string("SEARCH_PROVIDER_BASE_URL", &d.search_provider_base_url),
            sandbox_provider_base_url: env_string("SANDBOX_PROVIDER_BASE_URL", &d.sandbox_provider_base_url),
            memory_provider_base_url: env_string("MEMORY_PROVIDER_BASE_URL", &d.memory_provider_base_url),
            response_db_path: env_string("RESPONSE_DB_PATH", &d.response_db_path),
            media_db_path: env_string("MEDIA_DB_PATH", &d.media_db_path),
            jwt_secret: env_string("JWT_SECRET", &d.jwt_secret),
            jwt_issuer: env_string("JWT_ISSUER", &d.jwt_issuer),
            jwt_audience: env_string("JWT_AUDIENCE", &d.jwt_audience),
        }
    }
}

/// Process-wide settings resolved from the environment (spec.md §6.8).
///
/// Construct after [`crate::load_and_apply`] so `.env`/XDG values have already
/// landed in `std::env`; existing process env always wins over both.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_tool_execution_depth: u32,
    pub tool_execution_timeout: Duration,
    pub session_cleanup_interval: Duration,
    pub session_stale_ttl: Duration,
    pub livekit_token_ttl: Duration,
    pub media_max_bytes: u64,
    pub media_resolve_url: Option<String>,
    pub media_resolve_timeout: Duration,
    pub serper: ProviderResilience,
    pub mcp_truncation: McpTruncation,
    pub collaborators: CollaboratorConfig,
    /// Model the background worker pool's long-lived tool loop invokes with
    /// (spec.md §4.1.2 "Background"). Synchronous and streaming creates build
    /// a fresh chat-completions client per request from the caller's `model`
    /// field instead, since background workers are shared across requests and
    /// can't rebind per call.
    pub default_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_tool_execution_depth: 8,
            tool_execution_timeout: Duration::from_secs(45),
            session_cleanup_interval: Duration::from_secs(15),
            session_stale_ttl: Duration::from_secs(600),
            livekit_token_ttl: Duration::from_secs(24 * 3600),
            media_max_bytes: 20 * 1024 * 1024,
            media_resolve_url: None,
            media_resolve_timeout: Duration::from_secs(5),
            serper: ProviderResilience::default(),
            mcp_truncation: McpTruncation::default(),
            collaborators: CollaboratorConfig::default(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_tool_execution_depth: env_u32("MAX_TOOL_EXECUTION_DEPTH", d.max_tool_execution_depth),
            tool_execution_timeout: env_duration_secs("TOOL_EXECUTION_TIMEOUT", d.tool_execution_timeout),
            session_cleanup_interval: env_duration_secs(
                "SESSION_CLEANUP_INTERVAL",
                d.session_cleanup_interval,
            ),
            session_stale_ttl: env_duration_secs("SESSION_STALE_TTL", d.session_stale_ttl),
            livekit_token_ttl: env_duration_secs("LIVEKIT_TOKEN_TTL", d.livekit_token_ttl),
            media_max_bytes: env_u64("MEDIA_MAX_BYTES", d.media_max_bytes),
            media_resolve_url: std::env::var("MEDIA_RESOLVE_URL").ok(),
            media_resolve_timeout: env_duration_secs("MEDIA_RESOLVE_TIMEOUT", d.media_resolve_timeout),
            serper: ProviderResilience::from_env_prefixed("SERPER"),
            mcp_truncation: McpTruncation {
                max_snippet_chars: env_u32(
                    "MCP_MAX_SNIPPET_CHARS",
                    d.mcp_truncation.max_snippet_chars as u32,
                ) as usize,
                max_scrape_preview_chars: env_u32(
                    "MCP_MAX_SCRAPE_PREVIEW_CHARS",
                    d.mcp_truncation.max_scrape_preview_chars as u32,
                ) as usize,
                max_scrape_text_chars: env_u32(
                    "MCP_MAX_SCRAPE_TEXT_CHARS",
                    d.mcp_truncation.max_scrape_text_chars as u32,
                ) as usize,
            },
            collaborators: CollaboratorConfig::from_env(),
            default_model: env_string("DEFAULT_MODEL", &d.default_model),
        }
    }

    /// Bind address for the HTTP server; not part of spec.md §6.8 but needed to run the binary.
    pub fn bind_addr() -> String {
        env_string("JAN_SERVER_BIND_ADDR", "0.0.0.0:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.max_tool_execution_depth, 8);
        assert_eq!(s.tool_execution_timeout, Duration::from_secs(45));
        assert_eq!(s.session_cleanup_interval, Duration::from_secs(15));
        assert_eq!(s.session_stale_ttl, Duration::from_secs(600));
        assert_eq!(s.livekit_token_ttl, Duration::from_secs(86_400));
        assert_eq!(s.media_max_bytes, 20 * 1024 * 1024);
        assert_eq!(s.serper.cb_failure_threshold, 15);
        assert_eq!(s.serper.cb_success_threshold, 5);
        assert_eq!(s.serper.cb_timeout, Duration::from_secs(45));
        assert_eq!(s.serper.cb_max_half_open, 10);
        assert_eq!(s.serper.retry_max_attempts, 5);
    }

    #[test]
    fn from_env_overrides_default() {
        std::env::set_var("MAX_TOOL_EXECUTION_DEPTH", "3");
        let s = Settings::from_env();
        assert_eq!(s.max_tool_execution_depth, 3);
        std::env::remove_var("MAX_TOOL_EXECUTION_DEPTH");
    }
}
