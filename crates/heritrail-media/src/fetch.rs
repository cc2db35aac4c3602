//! Download a user-supplied image URL.
//!
//! The URL goes through the SSRF-guarded `get_public` path; the body is read in
//! chunks so an oversized image is cut off without being buffered in full.

use heritrail_common::SandboxClient;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use crate::error::{MediaError, Result};

#[instrument(skip(client))]
pub async fn fetch_image(client: &SandboxClient, url: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let mut resp = client.get_public(url)?.send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MediaError::Fetch(format!("upstream returned HTTP {}", status.as_u16())));
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if !content_type.starts_with("image/") {
        let shown = if content_type.is_empty() { "no content type" } else { content_type.as_str() };
        return Err(MediaError::NotAnImage(shown.to_string()));
    }

    if let Some(len) = resp.content_length() {
        if len as usize > max_bytes {
            return Err(MediaError::TooLarge { size: len as usize, max: max_bytes });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if body.len() + chunk.len() > max_bytes {
            return Err(MediaError::TooLarge { size: body.len() + chunk.len(), max: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }

    debug!(bytes = body.len(), %content_type, "Fetched image");
    Ok(body)
}
