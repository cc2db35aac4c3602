//! heritrail-media — Image proxy resizing and gallery variant generation.

pub mod error;
pub mod params;
pub mod fetch;
pub mod resize;
pub mod service;

pub use error::{MediaError, Result};
pub use fetch::fetch_image;
pub use params::{ProxyParams, ResizeRequest};
pub use resize::{gallery_variants, resize_to_jpeg, EncodedImage, ImageVariant};
pub use service::MediaService;
