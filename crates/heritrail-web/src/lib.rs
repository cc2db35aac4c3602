//! heritrail-web — HTTP API for the heritage site admin and public pages:
//!   - Bibliography resolver
//!   - Image proxy with resizing
//!   - Gallery uploads (admin)
//!   - Review hard-delete

pub mod error;
pub mod router;
pub mod handlers;
pub mod state;
