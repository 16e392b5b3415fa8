use crate::dispatch::Dispatcher;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/lark/callback", post(lark_callback))
        .with_state(state)
}

async fn index() -> &'static str {
    "lark-relay bot running"
}

/// Lark does not promise a JSON content type on callbacks, so the handler
/// takes the raw bytes and leaves decoding to the dispatcher.
async fn lark_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let outcome = state.dispatcher.handle(&body, &headers).await;
    (outcome.status, outcome.body)
}
