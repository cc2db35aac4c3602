//! Metadata provider clients.

pub mod crossref;
pub mod openalex;
pub mod openlibrary;
pub mod google_books;
pub mod citation_extractor;
pub mod html_meta;

use std::sync::Arc;

use async_trait::async_trait;
use heritrail_common::{Citation, QueryMode, SandboxClient, SourceKind};
use heritrail_config::ResolverConfig;
use serde_json::Value;

use crate::error::{ResolverError, Result};
use crate::models::{ClassifiedInput, InputKind};

pub use citation_extractor::CitationExtractorClient;
pub use crossref::CrossrefClient;
pub use google_books::GoogleBooksClient;
pub use html_meta::HtmlMetaClient;
pub use openalex::OpenAlexClient;
pub use openlibrary::OpenLibraryClient;

/// Common interface for all metadata providers.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this provider can answer this kind of input.
    fn supports(&self, input: &ClassifiedInput) -> bool;

    /// How the provider will be queried for this input.
    fn mode(&self, input: &ClassifiedInput) -> QueryMode {
        match input.kind {
            InputKind::Doi | InputKind::Isbn => QueryMode::Identifier,
            InputKind::Title => QueryMode::Search,
            InputKind::Url if input.doi.is_some() => QueryMode::Identifier,
            InputKind::Url => QueryMode::Page,
        }
    }

    /// Look the input up. Citations are returned as the provider describes them;
    /// the pipeline normalises them.
    async fn lookup(&self, input: &ClassifiedInput, limit: usize) -> Result<Vec<Citation>>;
}

/// Build the enabled providers from configuration.
/// The citation extractor is skipped when it has no base URL.
pub fn build_sources(config: &ResolverConfig, client: &SandboxClient) -> Vec<Arc<dyn MetadataSource>> {
    let endpoints = &config.endpoints;
    let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();

    for kind in config.enabled_sources() {
        match kind {
            SourceKind::DoiRegistry => sources.push(Arc::new(
                CrossrefClient::new(client.clone(), &endpoints.crossref, config.mailto.clone()),
            )),
            SourceKind::OpenAlex => sources.push(Arc::new(
                OpenAlexClient::new(client.clone(), &endpoints.openalex, config.mailto.clone()),
            )),
            SourceKind::OpenLibrary => sources.push(Arc::new(
                OpenLibraryClient::new(client.clone(), &endpoints.openlibrary),
            )),
            SourceKind::GoogleBooks => sources.push(Arc::new(
                GoogleBooksClient::new(client.clone(), &endpoints.google_books, config.google_books_key()),
            )),
            SourceKind::CitationExtractor => match &endpoints.citation_extractor {
                Some(base) => sources.push(Arc::new(CitationExtractorClient::new(client.clone(), base))),
                None => tracing::debug!("Citation extractor has no base URL; disabled"),
            },
            SourceKind::HtmlMeta => sources.push(Arc::new(HtmlMetaClient::new(client.clone()))),
        }
    }
    sources
}

// ── Response helpers ───────────────────────────────────────────────────────

/// Turn a non-2xx response into an error. 404 on an identifier lookup is not an
/// error: the provider simply does not know the work.
pub(crate) fn check_status(
    provider: SourceKind,
    resp: reqwest::Response,
) -> Result<Option<reqwest::Response>> {
    let status = resp.status();
    if status.is_success() {
        Ok(Some(resp))
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Ok(None)
    } else {
        Err(ResolverError::Status { provider, status: status.as_u16() })
    }
}

/// The value as a string, or the first string of an array.
pub(crate) fn str_or_first(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|i| i.as_str().map(String::from)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Every string in an array value, or the single string.
pub(crate) fn strings(v: &Value) -> Vec<String> {
    match v {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|i| i.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
