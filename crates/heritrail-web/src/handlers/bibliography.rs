//! Bibliography resolver endpoint used by the admin citation editor.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use heritrail_common::ApiError;
use heritrail_resolver::Resolution;
use serde::Deserialize;

use crate::error::IntoApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub input: String,
}

/// POST /api/bibliography/resolve
pub async fn resolve(
    State(state): State<SharedState>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<Resolution>, ApiError> {
    let Json(req) = body.map_err(IntoApiError::into_api)?;
    let resolution = state.resolver.resolve(&req.input).await.map_err(IntoApiError::into_api)?;
    Ok(Json(resolution))
}
