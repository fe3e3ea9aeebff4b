//! Application state and router assembly (spec §6): one axum `Router` mounting
//! the response, realtime, media, and MCP-bridge surfaces over a single set of
//! wired collaborator clients.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use jan_config::Settings;
use jan_mcp_bridge::{McpBridgeState, ProviderClient, ToolRegistry, WriteBackClient};
use jan_media::{HttpObjectStore, IngestService, MediaResolver, SqliteMediaStore};
use jan_orchestrator::{
    BackgroundWorkerPool, ConversationClient, HttpCatalogResolver, McpClient, ResponseService,
    SqliteResponseStore, ToolLoop, WebhookSender, WorkerPoolConfig,
};
use jan_realtime::{LiveKitTokenMinter, Reconciler, RealtimeService, SessionStore};
use model_spec_core::ModelLimitResolver;
use tokio_util::sync::CancellationToken;

use crate::{health, media, realtime, responses};

/// Everything the HTTP handlers need, already wired to the configured
/// collaborator base URLs. Cheap to clone (every field is an `Arc`).
pub struct AppState {
    pub settings: Arc<Settings>,
    pub response_store: Arc<SqliteResponseStore>,
    pub conversation_client: Arc<ConversationClient>,
    pub mcp_client: Arc<McpClient>,
    pub writeback_client: Arc<jan_mcp_bridge::WriteBackClient>,
    pub catalog: Arc<dyn ModelLimitResolver>,
    pub webhook: Arc<WebhookSender>,
    pub media_resolver: Arc<MediaResolver>,
    pub mcp_state: Arc<McpBridgeState>,
    pub realtime_service: Arc<RealtimeService>,
    pub reconciler: Arc<Reconciler>,
    pub ingest_service: Arc<IngestService>,
    /// Serves get/cancel/delete/list-input-items, which need a `ResponseService`
    /// but never exercise its bound model (see [`AppState::response_service`]).
    pub default_response_service: Arc<ResponseService>,
}

impl AppState {
    /// Builds a [`ResponseService`] bound to a fresh chat-completions client
    /// for `model` (spec §4.1.3 step 2 wants per-request model selection;
    /// `jan_agent::ChatOpenAI` binds its model at construction, so a
    /// synchronous or streaming create gets a purpose-built client rather
    /// than sharing the one baked into the background worker pool).
    pub fn response_service(&self, model: &str) -> ResponseService {
        let llm: Arc<dyn jan_agent::LlmClient> = Arc::new(jan_agent::ChatOpenAI::new(model));
        let tool_loop = Arc::new(ToolLoop::new(
            llm,
            Arc::clone(&self.mcp_client),
            Arc::clone(&self.conversation_client),
            Arc::clone(&self.writeback_client),
            Arc::clone(&self.catalog),
            Arc::clone(&self.settings),
            Arc::clone(&self.response_store),
        ));
        ResponseService::new(
            Arc::clone(&self.response_store),
            tool_loop,
            Arc::clone(&self.conversation_client),
            Arc::clone(&self.webhook),
            Arc::clone(&self.media_resolver),
        )
    }
}

/// Builds the full app from [`Settings`], opening the response/media stores
/// and standing up (but not starting) the reconciler and worker pool. The
/// caller is responsible for starting the reconciler and spawning the worker
/// pool with a shared [`CancellationToken`] (spec SPEC_FULL.md §2: graceful
/// shutdown extends to both).
pub fn build(settings: Settings) -> jan_core::JanResult<(Arc<AppState>, Arc<BackgroundWorkerPool>)> {
    let settings = Arc::new(settings);
    let http = reqwest::Client::new();

    let response_store = Arc::new(
        SqliteResponseStore::open(&settings.collaborators.response_db_path)
            .map_err(|e| jan_core::JanError::internal("jan_server", e.message))?,
    );
    let media_store = Arc::new(
        SqliteMediaStore::open(&settings.collaborators.media_db_path)
            .map_err(|e| jan_core::JanError::internal("jan_server", e.message))?,
    );

    let conversation_client = Arc::new(ConversationClient::new(
        http.clone(),
        settings.collaborators.conversation_api_base_url.clone(),
    ));
    let mcp_client = Arc::new(McpClient::new(
        http.clone(),
        format!("http://{}/v1/mcp", Settings::bind_addr()),
    ));
    let writeback_client = Arc::new(WriteBackClient::new(
        settings.collaborators.conversation_api_base_url.clone(),
    ));
    let catalog: Arc<dyn ModelLimitResolver> = Arc::new(HttpCatalogResolver::new(
        http.clone(),
        settings.collaborators.catalog_base_url.clone(),
    ));
    let webhook = Arc::new(WebhookSender::new(http.clone()));
    let media_resolver = Arc::new(MediaResolver::new(
        http.clone(),
        settings.media_resolve_url.clone(),
        settings.media_resolve_timeout,
    ));

    let mcp_state = Arc::new(McpBridgeState {
        registry: build_tool_registry(&settings),
    });

    let object_store = Arc::new(HttpObjectStore::new(
        http.clone(),
        settings.collaborators.object_store_base_url.clone(),
        settings.collaborators.object_store_bucket.clone(),
    ));
    let ingest_service = Arc::new(IngestService::new(
        media_store,
        object_store,
        http.clone(),
        settings.media_max_bytes,
    ));

    let session_store = Arc::new(SessionStore::new());
    let token_minter = Arc::new(LiveKitTokenMinter::new(
        settings.collaborators.livekit_api_key.clone(),
        settings.collaborators.livekit_api_secret.clone(),
    ));
    let realtime_service = Arc::new(RealtimeService::new(
        Arc::clone(&session_store),
        token_minter,
        settings.collaborators.livekit_ws_url.clone(),
        settings.livekit_token_ttl,
    ));
    let sfu_client: Arc<dyn jan_realtime::SfuClient> = Arc::new(jan_realtime::HttpSfuClient::new(
        http.clone(),
        settings.collaborators.sfu_base_url.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(
        session_store,
        sfu_client,
        settings.session_cleanup_interval,
        settings.session_stale_ttl,
    ));

    let background_llm: Arc<dyn jan_agent::LlmClient> =
        Arc::new(jan_agent::ChatOpenAI::new(settings.default_model.clone()));
    let background_tool_loop = Arc::new(ToolLoop::new(
        background_llm,
        Arc::clone(&mcp_client),
        Arc::clone(&conversation_client),
        Arc::clone(&writeback_client),
        Arc::clone(&catalog),
        Arc::clone(&settings),
        Arc::clone(&response_store),
    ));
    let worker_pool = Arc::new(BackgroundWorkerPool::new(
        Arc::clone(&response_store),
        Arc::clone(&background_tool_loop),
        Arc::clone(&webhook),
        WorkerPoolConfig::default(),
    ));

    // Get/cancel/delete/list-input-items never invoke the tool loop, so one
    // shared service (built on the same tool loop the worker pool uses)
    // serves them all instead of standing up a fresh `ChatOpenAI` client per
    // request the way a model-specific create does.
    let default_response_service = Arc::new(ResponseService::new(
        Arc::clone(&response_store),
        background_tool_loop,
        Arc::clone(&conversation_client),
        Arc::clone(&webhook),
        Arc::clone(&media_resolver),
    ));

    let state = Arc::new(AppState {
        settings,
        response_store,
        conversation_client,
        mcp_client,
        writeback_client,
        catalog,
        webhook,
        media_resolver,
        mcp_state,
        realtime_service,
        reconciler,
        ingest_service,
        default_response_service,
    });

    Ok((state, worker_pool))
}

fn build_tool_registry(settings: &Settings) -> ToolRegistry {
    let search_client = Arc::new(ProviderClient::new(
        settings.collaborators.search_provider_base_url.clone(),
        settings.serper.clone(),
    ));
    let sandbox_client = Arc::new(ProviderClient::new(
        settings.collaborators.sandbox_provider_base_url.clone(),
        settings.serper.clone(),
    ));
    let memory_client = Arc::new(ProviderClient::new(
        settings.collaborators.memory_provider_base_url.clone(),
        settings.serper.clone(),
    ));

    let mut registry = ToolRegistry::new(std::iter::empty::<String>());
    registry.register(Arc::new(jan_mcp_bridge::GoogleSearchTool::new(Arc::clone(&search_client))));
    registry.register(Arc::new(jan_mcp_bridge::ScrapeTool::new(
        search_client,
        settings.serper.scrape_timeout,
        settings.mcp_truncation.max_scrape_preview_chars,
    )));
    registry.register(Arc::new(jan_mcp_bridge::PythonExecTool::new(sandbox_client, false)));
    registry.register(Arc::new(jan_mcp_bridge::MemoryRetrieveTool::new(memory_client)));
    registry
}

/// Mounts every route (spec §6) over two state types: the app's own
/// `Arc<AppState>` router merged with the MCP bridge's `Arc<McpBridgeState>`
/// router, each built with their own `with_state` before merging (axum's
/// standard pattern for sub-routers with distinct state).
pub fn router(state: Arc<AppState>) -> Router {
    let mcp_router = Router::new()
        .route("/v1/mcp", post(jan_mcp_bridge::handle_mcp_request))
        .with_state(Arc::clone(&state.mcp_state));

    let app_router = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/responses", post(responses::create_response))
        .route(
            "/v1/responses/:id",
            get(responses::get_response).delete(responses::delete_response),
        )
        .route("/v1/responses/:id/cancel", post(responses::cancel_response))
        .route(
            "/v1/responses/:id/input_items",
            get(responses::list_input_items),
        )
        .route("/v1/media", post(media::ingest_media))
        .route(
            "/v1/realtime/sessions",
            post(realtime::create_session).get(realtime::list_sessions),
        )
        .route(
            "/v1/realtime/sessions/:id",
            get(realtime::get_session).delete(realtime::delete_session),
        )
        .with_state(state);

    app_router
        .merge(mcp_router)
        .layer(axum::middleware::from_fn(crate::request_id::attach_request_id))
}
