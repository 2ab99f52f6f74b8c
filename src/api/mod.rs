//! HTTP API module.
//!
//! Exposes the streamed chat endpoint plus search, scrape and health
//! endpoints over the same components.

mod handlers;
mod server;

pub use server::{
    build_http_client, create_router, http_client_builder, run_server, AppState, RequestId,
    REQUEST_ID_HEADER, UPSTREAM_IDLE_TIMEOUT,
};
