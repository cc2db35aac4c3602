//! Request and response types for the resolver pipeline.

use heritrail_common::{Candidate, SourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Doi,
    Isbn,
    Url,
    Title,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Doi   => "doi",
            InputKind::Isbn  => "isbn",
            InputKind::Url   => "url",
            InputKind::Title => "title",
        }
    }
}

/// What the user typed, after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedInput {
    /// Trimmed input as typed.
    pub raw: String,
    pub kind: InputKind,
    /// Normalised DOI, for DOI input or a DOI embedded in a URL.
    pub doi: Option<String>,
    pub isbn13: Option<String>,
    /// Present when the input was an ISBN-10, or an ISBN-13 with a 978 prefix.
    pub isbn10: Option<String>,
    /// Absolute URL for URL input.
    pub url: Option<String>,
    /// Whitespace-collapsed text for title searches.
    pub text: String,
}

impl ClassifiedInput {
    pub fn has_identifier(&self) -> bool {
        self.doi.is_some() || self.isbn13.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Ok,
    Error,
    Timeout,
}

/// How one provider fared on one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub source: SourceKind,
    pub outcome: ProviderOutcome,
    pub hits: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub input: String,
    pub kind: InputKind,
    pub candidates: Vec<Candidate>,
    pub providers: Vec<ProviderReport>,
    pub elapsed_ms: u64,
}
