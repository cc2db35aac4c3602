//! heritrail-common — Shared types, errors, and the outbound HTTP client used across all Heritrail crates.

pub mod error;
pub mod entities;
pub mod confidence;
pub mod format;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{Author, Candidate, Citation, CitationKind, QueryMode, SourceHit, SourceKind};
pub use error::{ApiError, HeritrailError, Result};
pub use sandbox::SandboxClient;
