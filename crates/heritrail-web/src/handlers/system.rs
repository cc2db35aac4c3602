//! Liveness endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let providers: Vec<&str> = state.resolver.source_kinds().iter().map(|k| k.as_str()).collect();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": providers,
    }))
}
