//! Site gallery images: upload resized variants, then record them in `site_images`.
//!
//! Objects live at `{site_id}/{image_id}/{variant}.jpg`. When any step fails the
//! objects already uploaded are removed again, best effort.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::client::BackendClient;
use crate::error::Result;

/// One encoded variant ready for upload.
#[derive(Debug, Clone)]
pub struct VariantUpload {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVariant {
    pub name: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: String,
    pub site_id: String,
    pub variants: Vec<StoredVariant>,
}

pub fn variant_path(site_id: &str, image_id: &str, variant: &str) -> String {
    format!("{site_id}/{image_id}/{variant}.jpg")
}

/// Upload every variant, then insert the gallery row.
#[instrument(skip(client, uploads), fields(n = uploads.len()))]
pub async fn store_gallery_image(
    client: &BackendClient,
    site_id: &str,
    uploaded_by: &str,
    uploads: Vec<VariantUpload>,
) -> Result<GalleryImage> {
    let bucket = client.config().gallery_bucket.clone();
    let image_id = Uuid::new_v4().to_string();
    let mut stored: Vec<StoredVariant> = Vec::with_capacity(uploads.len());

    for upload in uploads {
        let path = variant_path(site_id, &image_id, &upload.name);
        let size = upload.bytes.len();
        if let Err(e) = client.storage_upload(&bucket, &path, upload.bytes, &upload.content_type).await {
            remove_best_effort(client, &bucket, &stored).await;
            return Err(e);
        }
        stored.push(StoredVariant { name: upload.name, path, width: upload.width, height: upload.height, bytes: size });
    }

    record_gallery_image(client, &image_id, site_id, uploaded_by, stored).await
}

/// Insert the `site_images` row; on failure remove the uploaded objects.
#[instrument(skip(client, variants))]
pub async fn record_gallery_image(
    client: &BackendClient,
    image_id: &str,
    site_id: &str,
    uploaded_by: &str,
    variants: Vec<StoredVariant>,
) -> Result<GalleryImage> {
    let cfg = client.config();
    let mut by_name = Map::new();
    for v in &variants {
        by_name.insert(
            v.name.clone(),
            json!({ "path": v.path, "width": v.width, "height": v.height, "bytes": v.bytes }),
        );
    }
    // The largest variant doubles as the canonical image
    let storage_path = variants.iter().max_by_key(|v| v.width).map(|v| v.path.clone());

    let row = json!({
        "id": image_id,
        "site_id": site_id,
        "storage_path": storage_path,
        "variants": Value::Object(by_name),
        "uploaded_by": uploaded_by,
    });

    match client.insert::<Value, Value>(&cfg.site_images_table, &row).await {
        Ok(_) => {
            info!(image = image_id, variants = variants.len(), "Gallery image recorded");
            Ok(GalleryImage { id: image_id.to_string(), site_id: site_id.to_string(), variants })
        }
        Err(e) => {
            remove_best_effort(client, &cfg.gallery_bucket, &variants).await;
            Err(e)
        }
    }
}

async fn remove_best_effort(client: &BackendClient, bucket: &str, variants: &[StoredVariant]) {
    let paths: Vec<String> = variants.iter().map(|v| v.path.clone()).collect();
    if let Err(e) = client.storage_remove(bucket, &paths).await {
        warn!(error = %e, n = paths.len(), "Failed to clean up gallery uploads");
    }
}
