//! HTTP server setup and configuration.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use crate::answer::AnswerOrchestrator;
use crate::config::Config;
use crate::extract::PageExtractor;
use crate::search::SearchRouter;

/// Response header: correlation ID (UUID v4).
pub const REQUEST_ID_HEADER: &str = "x-clark-request-id";

/// Per-request correlation ID, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: Arc<SearchRouter>,
    pub extractor: PageExtractor,
    pub orchestrator: Arc<AnswerOrchestrator>,
}

impl AppState {
    /// Wire every component onto one configuration and connection pool.
    pub fn new(config: Arc<Config>, http_client: Client) -> Self {
        let fetch_timeout = Duration::from_secs(config.search.timeout_secs);
        let search = Arc::new(SearchRouter::new(&config, http_client.clone()));
        let extractor = PageExtractor::new(http_client.clone(), fetch_timeout);
        let orchestrator = Arc::new(AnswerOrchestrator::new(
            config.clone(),
            http_client,
            search.clone(),
            extractor.clone(),
        ));

        Self {
            config,
            search,
            extractor,
            orchestrator,
        }
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/search", get(handlers::search))
        .route("/api/scrape", get(handlers::scrape))
        .route("/health", get(handlers::health))
        // State and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(assign_request_id)),
        )
}

/// Tag the request with a fresh ID and echo it on the response.
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Longest silence tolerated between reads of an upstream body.
pub const UPSTREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the shared HTTP client.
pub fn build_http_client() -> reqwest::Result<Client> {
    http_client_builder(UPSTREAM_IDLE_TIMEOUT).build()
}

/// Client settings shared by every upstream call.
///
/// There is no total deadline: model answers stream for as long as tokens
/// keep arriving. Search and page fetches set their own per-request timeout.
pub fn http_client_builder(idle_timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(idle_timeout)
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let config = Arc::new(config);

    tracing::info!(
        deployment = %config.deployment,
        model_credentials = config.credentials.has_model_provider(),
        tavily = config.credentials.tavily_api_key.is_some(),
        "Configuration loaded"
    );

    let state = AppState::new(config, build_http_client()?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting clark server");

    axum::serve(listener, app).await?;

    Ok(())
}
