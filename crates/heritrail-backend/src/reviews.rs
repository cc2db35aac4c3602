//! Review hard-delete.
//!
//! 1. Authenticate the caller
//! 2. Load the review and check the caller wrote it
//! 3. Run the `hard_delete_review` procedure, which cascades to votes and replies
//! 4. Remove the review's images from storage (best effort)

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::client::BackendClient;
use crate::error::{BackendError, Result};

pub const HARD_DELETE_RPC: &str = "hard_delete_review";

#[derive(Debug, Deserialize)]
struct ReviewRow {
    user_id: String,
    #[serde(default)]
    image_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedReview {
    pub review_id: String,
    /// Images that were removed from storage; zero when cleanup failed.
    pub images_removed: usize,
}

#[instrument(skip(client, access_token))]
pub async fn hard_delete_review(client: &BackendClient, access_token: &str, review_id: &str) -> Result<DeletedReview> {
    let user = client.auth_user(access_token).await?;
    let cfg = client.config();

    let filter = format!("eq.{review_id}");
    let rows: Vec<ReviewRow> = client
        .select(&cfg.reviews_table, &[("id", filter.as_str())], "id,user_id,image_paths")
        .await?;
    let review = rows
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::NotFound(format!("review {review_id}")))?;

    if review.user_id != user.id {
        warn!(user = %user.id, "Attempt to delete another user's review");
        return Err(BackendError::Forbidden("you can only delete your own reviews".to_string()));
    }

    client.rpc(HARD_DELETE_RPC, &json!({ "review_id": review_id })).await?;

    let paths = review.image_paths.unwrap_or_default();
    let images_removed = match client.storage_remove(&cfg.review_images_bucket, &paths).await {
        Ok(()) => paths.len(),
        Err(e) => {
            // The review is already gone; orphaned images are tolerated
            warn!(error = %e, n = paths.len(), "Failed to remove review images");
            0
        }
    };

    info!(user = %user.id, images_removed, "Review hard-deleted");
    Ok(DeletedReview { review_id: review_id.to_string(), images_removed })
}
