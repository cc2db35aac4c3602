//! Review hard-delete for the review's author.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use heritrail_common::ApiError;
use serde::{Deserialize, Serialize};

use super::{bearer_token, parse_id};
use crate::error::IntoApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewRequest {
    pub review_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReviewResponse {
    pub deleted: bool,
    pub images_removed: usize,
}

/// POST /api/reviews/delete
pub async fn delete_review(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<DeleteReviewRequest>, JsonRejection>,
) -> Result<Json<DeleteReviewResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    let Json(req) = body.map_err(IntoApiError::into_api)?;
    let review_id = parse_id(&req.review_id, "review id")?;

    let deleted = heritrail_backend::hard_delete_review(&state.backend, token, &review_id)
        .await
        .map_err(IntoApiError::into_api)?;

    Ok(Json(DeleteReviewResponse { deleted: true, images_removed: deleted.images_removed }))
}
