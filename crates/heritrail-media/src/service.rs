//! Media operations with their HTTP client and limits bundled for the web layer.

use heritrail_common::SandboxClient;
use heritrail_config::MediaConfig;
use tracing::{debug, instrument};

use crate::error::{MediaError, Result};
use crate::fetch::fetch_image;
use crate::params::ProxyParams;
use crate::resize::{gallery_variants, resize_to_jpeg, EncodedImage, ImageVariant};

#[derive(Debug, Clone)]
pub struct MediaService {
    client: SandboxClient,
    config: MediaConfig,
}

impl MediaService {
    /// The client only ever fetches user-supplied URLs, so its allowlist is empty.
    pub fn new(config: &MediaConfig, user_agent: &str, allow_private_hosts: bool) -> Result<Self> {
        let client = SandboxClient::new(
            &[],
            std::time::Duration::from_millis(config.fetch_timeout_ms),
            user_agent,
            allow_private_hosts,
        )?;
        Ok(Self { client, config: config.clone() })
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Fetch a remote image and return it resized as JPEG.
    #[instrument(skip(self), fields(url = %params.url))]
    pub async fn proxy(&self, params: &ProxyParams) -> Result<EncodedImage> {
        let req = params.resolve(&self.config);
        let source = fetch_image(&self.client, &req.url, self.config.max_bytes).await?;
        let out = blocking(move || resize_to_jpeg(&source, req.width, req.quality)).await?;
        debug!(width = out.width, height = out.height, bytes = out.bytes.len(), "Proxied image");
        Ok(out)
    }

    /// Gallery variants of an uploaded image.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn variants(&self, bytes: Vec<u8>) -> Result<Vec<ImageVariant>> {
        if bytes.len() > self.config.max_bytes {
            return Err(MediaError::TooLarge { size: bytes.len(), max: self.config.max_bytes });
        }
        let widths = self.config.variants;
        let quality = self.config.default_quality;
        blocking(move || gallery_variants(&bytes, &widths, quality)).await
    }
}

/// Image codecs are CPU-bound; keep them off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::Encode(format!("image task failed: {e}")))?
}
