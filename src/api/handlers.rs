//! HTTP request handlers.

use axum::{
    body::{Body, Bytes},
    extract::{Extension, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;

use super::server::{AppState, RequestId};
use crate::answer::ChatInput;
use crate::error::{Error, Result};
use crate::extract::ScrapedPage;
use crate::search::SearchResponse;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Handle POST /api/chat
///
/// Always answers 200 with streamed plain text; failures are reported inside
/// the body.
pub async fn chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let input = ChatInput::from_body(&body);

    tracing::info!(
        request_id = %request_id,
        model = ?input.model,
        prompt_chars = input.prompt.chars().count(),
        search = ?input.search,
        "Received chat request"
    );

    let answer = state.orchestrator.answer(input).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        Body::from_stream(answer.map(Ok::<_, Infallible>)),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    max_results: Option<usize>,
}

/// Handle GET /api/search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::BadRequest("missing query parameter 'q'".to_string()))?;

    let response = state.search.search(query, params.max_results).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    url: Option<String>,
}

/// Handle GET /api/scrape
pub async fn scrape(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ScrapedPage>> {
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::BadRequest("missing query parameter 'url'".to_string()))?;

    let page = state.extractor.extract(url).await?;
    Ok(Json(page))
}

/// Handle GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clark",
        "deployment": state.config.deployment,
        "configured": state.config.credentials.has_model_provider(),
    }))
}
