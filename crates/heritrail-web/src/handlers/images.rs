//! Image proxy: fetch a remote image and serve it resized as JPEG.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use heritrail_common::ApiError;
use heritrail_media::ProxyParams;

use crate::error::IntoApiError;
use crate::state::SharedState;

pub const CACHE_POLICY: &str = "public, max-age=86400";

/// GET /api/image-proxy?url=&w=&q=
pub async fn image_proxy(
    State(state): State<SharedState>,
    params: Result<Query<ProxyParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(IntoApiError::into_api)?;
    if params.url.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing image url".to_string()));
    }
    let image = state.media.proxy(&params).await.map_err(IntoApiError::into_api)?;
    Ok(([(CONTENT_TYPE, "image/jpeg"), (CACHE_CONTROL, CACHE_POLICY)], image.bytes))
}
