//! Open Library book metadata client.
//!
//! API: {base}/api/books?bibkeys=ISBN:{isbn}&format=json&jscmd=data for ISBNs,
//!      {base}/search.json?q= for titles.

use async_trait::async_trait;
use heritrail_common::{Author, Citation, CitationKind, SandboxClient, SourceKind};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_status, str_or_first, strings, trim_base, MetadataSource};
use crate::error::Result;
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{extract_year, normalise_author};

pub struct OpenLibraryClient {
    client: SandboxClient,
    base: String,
}

impl OpenLibraryClient {
    pub fn new(client: SandboxClient, base: &str) -> Self {
        Self { client, base: trim_base(base) }
    }

    #[instrument(skip(self))]
    pub async fn book_by_isbn(&self, isbn: &str) -> Result<Option<Citation>> {
        let url = format!("{}/api/books", self.base);
        let bibkey = format!("ISBN:{isbn}");
        let resp = self
            .client
            .get(&url)?
            .query(&[("bibkeys", bibkey.as_str()), ("format", "json"), ("jscmd", "data")])
            .send()
            .await?;
        let Some(resp) = check_status(SourceKind::OpenLibrary, resp)? else {
            return Ok(None);
        };
        let body: Value = resp.json().await?;
        // Unknown ISBNs come back as an empty object
        Ok(body.get(&bibkey).map(|book| book_to_citation(book, isbn)))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Citation>> {
        let url = format!("{}/search.json", self.base);
        let limit = limit.to_string();
        let resp = self
            .client
            .get(&url)?
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;
        let Some(resp) = check_status(SourceKind::OpenLibrary, resp)? else {
            return Ok(Vec::new());
        };
        let body: Value = resp.json().await?;
        let docs = body["docs"].as_array().cloned().unwrap_or_default();
        debug!(n = docs.len(), "Open Library search results");
        Ok(docs.iter().map(|d| doc_to_citation(d, &self.base)).collect())
    }
}

#[async_trait]
impl MetadataSource for OpenLibraryClient {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenLibrary
    }

    fn supports(&self, input: &ClassifiedInput) -> bool {
        matches!(input.kind, InputKind::Isbn | InputKind::Title)
    }

    async fn lookup(&self, input: &ClassifiedInput, limit: usize) -> Result<Vec<Citation>> {
        match (&input.isbn13, input.kind) {
            (Some(isbn), InputKind::Isbn) => Ok(self.book_by_isbn(isbn).await?.into_iter().collect()),
            (_, InputKind::Title) => self.search(&input.text, limit).await,
            _ => Ok(Vec::new()),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| items.iter().filter_map(|i| i["name"].as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// `jscmd=data` record.
fn book_to_citation(book: &Value, isbn: &str) -> Citation {
    let authors: Vec<Author> = names(&book["authors"]).iter().map(|n| normalise_author(n)).collect();

    let mut isbns = strings(&book["identifiers"]["isbn_13"]);
    isbns.extend(strings(&book["identifiers"]["isbn_10"]));
    if isbns.is_empty() {
        isbns.push(isbn.to_string());
    }

    let publish_date = book["publish_date"].as_str().unwrap_or("");

    Citation {
        kind: CitationKind::Book,
        title: book["title"].as_str().map(String::from),
        subtitle: book["subtitle"].as_str().map(String::from),
        authors,
        year: extract_year(publish_date),
        publisher: names(&book["publishers"]).into_iter().next(),
        publisher_place: names(&book["publish_places"]).into_iter().next(),
        pages: book["pagination"].as_str().map(String::from),
        isbns,
        url: book["url"].as_str().map(String::from),
        ..Default::default()
    }
}

/// `search.json` document.
fn doc_to_citation(doc: &Value, base: &str) -> Citation {
    let authors: Vec<Author> = strings(&doc["author_name"]).iter().map(|n| normalise_author(n)).collect();
    // Search documents list every edition's ISBN; keep a handful
    let isbns: Vec<String> = strings(&doc["isbn"]).into_iter().take(5).collect();

    Citation {
        kind: CitationKind::Book,
        title: doc["title"].as_str().map(String::from),
        subtitle: doc["subtitle"].as_str().map(String::from),
        authors,
        year: doc["first_publish_year"].as_i64().map(|y| y as i32),
        publisher: str_or_first(&doc["publisher"]),
        isbns,
        url: doc["key"].as_str().map(|k| format!("{base}{k}")),
        language: str_or_first(&doc["language"]),
        ..Default::default()
    }
}
