//! heritrail-resolver — Bibliography lookup pipeline.
//!
//! input classifier → parallel provider fetches → normaliser → deduplicator → ranker
//!
//! One pass per request: no retries, no caching, no state shared between requests.

pub mod error;
pub mod models;
pub mod classify;
pub mod normalise;
pub mod sources;
pub mod dedup;
pub mod pipeline;

pub use classify::{classify, classify_with_limit};
pub use error::{ResolverError, Result};
pub use models::{ClassifiedInput, InputKind, ProviderOutcome, ProviderReport, Resolution};
pub use normalise::CitationExt;
pub use pipeline::{Resolver, ResolverSettings};
