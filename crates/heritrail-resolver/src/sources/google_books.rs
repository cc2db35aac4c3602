//! Google Books volumes client.
//!
//! API: {base}/volumes?q=isbn:{isbn} | q=intitle:{title}
//! Works without a key at a low quota; the key is read from the env var named in config.

use async_trait::async_trait;
use heritrail_common::{Citation, CitationKind, SandboxClient, SourceKind};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_status, strings, trim_base, MetadataSource};
use crate::error::Result;
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{extract_year, normalise_author, parse_issued};

/// Google caps `maxResults` at 40.
const MAX_RESULTS: usize = 40;

pub struct GoogleBooksClient {
    client: SandboxClient,
    base: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(client: SandboxClient, base: &str, api_key: Option<String>) -> Self {
        Self { client, base: trim_base(base), api_key }
    }

    #[instrument(skip(self))]
    pub async fn volumes(&self, q: &str, max_results: usize) -> Result<Vec<Citation>> {
        let url = format!("{}/volumes", self.base);
        let max = max_results.clamp(1, MAX_RESULTS).to_string();
        let mut params = vec![("q", q), ("maxResults", max.as_str()), ("printType", "books")];
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }
        let resp = self.client.get(&url)?.query(&params).send().await?;
        let Some(resp) = check_status(SourceKind::GoogleBooks, resp)? else {
            return Ok(Vec::new());
        };
        let body: Value = resp.json().await?;
        let items = body["items"].as_array().cloned().unwrap_or_default();
        debug!(n = items.len(), "Google Books results");
        Ok(items.iter().map(|i| volume_to_citation(&i["volumeInfo"])).collect())
    }
}

#[async_trait]
impl MetadataSource for GoogleBooksClient {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleBooks
    }

    fn supports(&self, input: &ClassifiedInput) -> bool {
        matches!(input.kind, InputKind::Isbn | InputKind::Title)
    }

    async fn lookup(&self, input: &ClassifiedInput, limit: usize) -> Result<Vec<Citation>> {
        match (&input.isbn13, input.kind) {
            (Some(isbn), InputKind::Isbn) => self.volumes(&format!("isbn:{isbn}"), 1).await,
            (_, InputKind::Title) => self.volumes(&format!("intitle:{}", input.text), limit).await,
            _ => Ok(Vec::new()),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn volume_to_citation(info: &Value) -> Citation {
    let isbns: Vec<String> = info["industryIdentifiers"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter(|id| matches!(id["type"].as_str(), Some("ISBN_13") | Some("ISBN_10")))
                .filter_map(|id| id["identifier"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let published = info["publishedDate"].as_str().unwrap_or("");

    Citation {
        kind: CitationKind::Book,
        title: info["title"].as_str().map(String::from),
        subtitle: info["subtitle"].as_str().map(String::from),
        authors: strings(&info["authors"]).iter().map(|a| normalise_author(a)).collect(),
        year: extract_year(published),
        issued: parse_issued(published),
        publisher: info["publisher"].as_str().map(String::from),
        isbns,
        url: info["canonicalVolumeLink"]
            .as_str()
            .or_else(|| info["infoLink"].as_str())
            .map(String::from),
        language: info["language"].as_str().map(String::from),
        abstract_text: info["description"].as_str().map(String::from),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_volume_to_citation() {
        let info = json!({
            "title": "The Parthenon",
            "authors": ["Mary Beard"],
            "publisher": "Harvard University Press",
            "publishedDate": "2010-04",
            "industryIdentifiers": [
                {"type": "ISBN_13", "identifier": "9780674055636"},
                {"type": "OTHER", "identifier": "HARVARD:123"}
            ],
            "canonicalVolumeLink": "https://books.google.com/books/about/The_Parthenon.html?id=x",
            "language": "en"
        });
        let c = volume_to_citation(&info);
        assert_eq!(c.authors[0].family.as_deref(), Some("Beard"));
        assert_eq!(c.year, Some(2010));
        assert_eq!(c.isbns, vec!["9780674055636".to_string()]);
        assert!(c.url.unwrap().contains("books.google.com"));
    }
}
