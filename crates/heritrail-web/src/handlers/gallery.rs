//! Admin gallery uploads: one source image in, three stored JPEG variants out.

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use heritrail_backend::{require_admin, store_gallery_image, GalleryImage, VariantUpload};
use heritrail_common::ApiError;
use tracing::info;

use super::{bearer_token, parse_id};
use crate::error::IntoApiError;
use crate::state::SharedState;

struct UploadForm {
    site_id: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut site_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(IntoApiError::into_api)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "site_id" => site_id = Some(field.text().await.map_err(IntoApiError::into_api)?),
            "file" => {
                let content_type = field.content_type().unwrap_or("").to_lowercase();
                let bytes = field.bytes().await.map_err(IntoApiError::into_api)?;
                file = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let site_id = site_id.ok_or_else(|| ApiError::BadRequest("Missing site_id".to_string()))?;
    let (content_type, bytes) = file.ok_or_else(|| ApiError::BadRequest("Missing file".to_string()))?;
    Ok(UploadForm { site_id, content_type, bytes })
}

/// POST /api/gallery/upload (multipart: `site_id`, `file`)
pub async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<GalleryImage>, ApiError> {
    let token = bearer_token(&headers)?;
    let admin = require_admin(&state.backend, token).await.map_err(IntoApiError::into_api)?;

    let form = read_form(multipart).await?;
    let site_id = parse_id(&form.site_id, "site id")?;
    if !form.content_type.starts_with("image/") {
        return Err(ApiError::UnsupportedMedia("Please upload an image file".to_string()));
    }

    let variants = state.media.variants(form.bytes).await.map_err(IntoApiError::into_api)?;
    let uploads: Vec<VariantUpload> = variants
        .into_iter()
        .map(|v| VariantUpload {
            name: v.name,
            width: v.width,
            height: v.height,
            content_type: "image/jpeg".to_string(),
            bytes: v.bytes,
        })
        .collect();

    let image = store_gallery_image(&state.backend, &site_id, &admin.id, uploads)
        .await
        .map_err(IntoApiError::into_api)?;
    info!(site = %site_id, image = %image.id, "Gallery image uploaded");
    Ok(Json(image))
}
