//! Citation extraction via a Zotero translation server.
//!
//! POST {base}/web    body: page URL (text/plain)   → Zotero items for the page
//! POST {base}/search body: DOI or ISBN (text/plain) → Zotero items for the identifier
//!
//! A 300 response means the page lists several items and wants a choice; we treat
//! that as no result rather than guessing.

use async_trait::async_trait;
use heritrail_common::{Author, Citation, CitationKind, QueryMode, SandboxClient, SourceKind};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_status, trim_base, MetadataSource};
use crate::error::Result;
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{extract_year, parse_issued};

pub struct CitationExtractorClient {
    client: SandboxClient,
    base: String,
}

impl CitationExtractorClient {
    pub fn new(client: SandboxClient, base: &str) -> Self {
        Self { client, base: trim_base(base) }
    }

    #[instrument(skip(self))]
    async fn translate(&self, endpoint: &str, body: &str) -> Result<Vec<Citation>> {
        let url = format!("{}/{}", self.base, endpoint);
        let resp = self
            .client
            .post(&url)?
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await?;
        if resp.status() == StatusCode::MULTIPLE_CHOICES {
            debug!("Translation server returned a selection list; skipping");
            return Ok(Vec::new());
        }
        let Some(resp) = check_status(SourceKind::CitationExtractor, resp)? else {
            return Ok(Vec::new());
        };
        let items: Value = resp.json().await?;
        let items = items.as_array().cloned().unwrap_or_default();
        debug!(n = items.len(), "Translation server items");
        Ok(items
            .iter()
            .filter(|i| !matches!(i["itemType"].as_str(), Some("note") | Some("attachment")))
            .map(item_to_citation)
            .collect())
    }
}

#[async_trait]
impl MetadataSource for CitationExtractorClient {
    fn kind(&self) -> SourceKind {
        SourceKind::CitationExtractor
    }

    fn supports(&self, input: &ClassifiedInput) -> bool {
        !matches!(input.kind, InputKind::Title)
    }

    /// Pages are read directly even when their URL carries a DOI.
    fn mode(&self, input: &ClassifiedInput) -> QueryMode {
        match input.kind {
            InputKind::Url => QueryMode::Page,
            _ => QueryMode::Identifier,
        }
    }

    async fn lookup(&self, input: &ClassifiedInput, limit: usize) -> Result<Vec<Citation>> {
        let mut items = match input.kind {
            InputKind::Url => match &input.url {
                Some(url) => self.translate("web", url).await?,
                None => Vec::new(),
            },
            InputKind::Doi => match &input.doi {
                Some(doi) => self.translate("search", doi).await?,
                None => Vec::new(),
            },
            InputKind::Isbn => match &input.isbn13 {
                Some(isbn) => self.translate("search", isbn).await?,
                None => Vec::new(),
            },
            InputKind::Title => Vec::new(),
        };
        items.truncate(limit);
        Ok(items)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn item_to_citation(item: &Value) -> Citation {
    let kind = match item["itemType"].as_str() {
        Some("webpage") | Some("blogPost") | Some("forumPost") => CitationKind::Webpage,
        Some(other) => CitationKind::from_provider_type(other),
        None => CitationKind::Other,
    };

    let creators = item["creators"].as_array().cloned().unwrap_or_default();
    let mut authors: Vec<Author> = creators
        .iter()
        .filter(|c| c["creatorType"].as_str().unwrap_or("author") == "author")
        .map(creator_to_author)
        .collect();
    if authors.is_empty() {
        authors = creators.iter().map(creator_to_author).collect();
    }

    let container = ["publicationTitle", "bookTitle", "websiteTitle", "proceedingsTitle", "blogTitle"]
        .iter()
        .find_map(|k| item[*k].as_str().map(String::from));

    let date = item["date"].as_str().unwrap_or("");

    Citation {
        kind,
        title: item["title"].as_str().map(String::from),
        authors,
        year: extract_year(date),
        issued: parse_issued(date),
        container_title: container,
        publisher: item["publisher"]
            .as_str()
            .or_else(|| item["university"].as_str())
            .or_else(|| item["institution"].as_str())
            .map(String::from),
        publisher_place: item["place"].as_str().map(String::from),
        volume: item["volume"].as_str().map(String::from),
        issue: item["issue"].as_str().map(String::from),
        pages: item["pages"].as_str().map(String::from),
        doi: item["DOI"].as_str().map(String::from),
        // Zotero packs every ISBN into one space-separated field
        isbns: item["ISBN"]
            .as_str()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default(),
        url: item["url"].as_str().map(String::from),
        language: item["language"].as_str().map(String::from),
        abstract_text: item["abstractNote"].as_str().map(String::from),
        ..Default::default()
    }
}

fn creator_to_author(c: &Value) -> Author {
    match c["name"].as_str() {
        Some(name) => Author { literal: Some(name.to_string()), ..Default::default() },
        None => Author {
            given: c["firstName"].as_str().map(String::from),
            family: c["lastName"].as_str().map(String::from),
            literal: None,
        },
    }
}
