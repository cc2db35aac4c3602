//! heritrail-backend — Client for the hosted backend (REST tables, auth, object storage)
//! and the privileged operations built on it.

pub mod error;
pub mod client;
pub mod auth;
pub mod reviews;
pub mod gallery;

pub use auth::require_admin;
pub use client::{AuthUser, BackendClient};
pub use error::{BackendError, Result};
pub use gallery::{record_gallery_image, store_gallery_image, GalleryImage, StoredVariant, VariantUpload};
pub use reviews::{hard_delete_review, DeletedReview};
