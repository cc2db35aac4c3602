//! OpenAlex academic works index client.
//!
//! API: {base}/works/doi:{doi}, {base}/works?search=
//! Abstracts arrive as an inverted index (word → positions) and are rebuilt here.

use async_trait::async_trait;
use heritrail_common::{Author, Citation, CitationKind, SandboxClient, SourceKind};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_status, trim_base, MetadataSource};
use crate::error::Result;
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{normalise_author, parse_issued};

pub struct OpenAlexClient {
    client: SandboxClient,
    base: String,
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn new(client: SandboxClient, base: &str, mailto: Option<String>) -> Self {
        Self { client, base: trim_base(base), mailto }
    }

    fn request(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        let mut req = self.client.get(url)?;
        if let Some(m) = &self.mailto {
            req = req.query(&[("mailto", m.as_str())]);
        }
        Ok(req)
    }

    #[instrument(skip(self))]
    pub async fn work_by_doi(&self, doi: &str) -> Result<Option<Citation>> {
        let url = format!("{}/works/doi:{}", self.base, doi);
        let resp = self.request(&url)?.send().await?;
        let Some(resp) = check_status(SourceKind::OpenAlex, resp)? else {
            return Ok(None);
        };
        let work: Value = resp.json().await?;
        Ok(Some(work_to_citation(&work)))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, per_page: usize) -> Result<Vec<Citation>> {
        let url = format!("{}/works", self.base);
        let per_page = per_page.to_string();
        let resp = self
            .request(&url)?
            .query(&[("search", query), ("per-page", per_page.as_str())])
            .send()
            .await?;
        let Some(resp) = check_status(SourceKind::OpenAlex, resp)? else {
            return Ok(Vec::new());
        };
        let body: Value = resp.json().await?;
        let results = body["results"].as_array().cloned().unwrap_or_default();
        debug!(n = results.len(), "OpenAlex search results");
        Ok(results.iter().map(work_to_citation).collect())
    }
}

#[async_trait]
impl MetadataSource for OpenAlexClient {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlex
    }

    fn supports(&self, input: &ClassifiedInput) -> bool {
        match input.kind {
            InputKind::Doi | InputKind::Title => true,
            InputKind::Url => input.doi.is_some(),
            InputKind::Isbn => false,
        }
    }

    async fn lookup(&self, input: &ClassifiedInput, limit: usize) -> Result<Vec<Citation>> {
        match (&input.doi, input.kind) {
            (Some(doi), _) => Ok(self.work_by_doi(doi).await?.into_iter().collect()),
            (None, InputKind::Title) => self.search(&input.text, limit).await,
            _ => Ok(Vec::new()),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn work_to_citation(work: &Value) -> Citation {
    let title = work["title"]
        .as_str()
        .or_else(|| work["display_name"].as_str())
        .map(String::from);

    let authors: Vec<Author> = work["authorships"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|a| a["author"]["display_name"].as_str())
                .map(normalise_author)
                .collect()
        })
        .unwrap_or_default();

    let location = &work["primary_location"]["source"];
    let biblio = &work["biblio"];
    let pages = match (biblio["first_page"].as_str(), biblio["last_page"].as_str()) {
        (Some(f), Some(l)) if f != l => Some(format!("{f}-{l}")),
        (Some(f), _) => Some(f.to_string()),
        _ => None,
    };

    let url = work["primary_location"]["landing_page_url"]
        .as_str()
        .or_else(|| work["doi"].as_str())
        .map(String::from);

    Citation {
        kind: work["type"]
            .as_str()
            .map(CitationKind::from_provider_type)
            .unwrap_or_default(),
        title,
        authors,
        year: work["publication_year"].as_i64().map(|y| y as i32),
        issued: work["publication_date"].as_str().and_then(parse_issued),
        container_title: location["display_name"].as_str().map(String::from),
        publisher: location["host_organization_name"].as_str().map(String::from),
        volume: biblio["volume"].as_str().map(String::from),
        issue: biblio["issue"].as_str().map(String::from),
        pages,
        doi: work["doi"].as_str().map(String::from),
        url,
        language: work["language"].as_str().map(String::from),
        abstract_text: work["abstract_inverted_index"].as_object().map(rebuild_abstract),
        ..Default::default()
    }
}

/// Rebuild text from `{"word": [positions...]}`.
fn rebuild_abstract(index: &serde_json::Map<String, Value>) -> String {
    let mut positioned: Vec<(u64, &str)> = index
        .iter()
        .flat_map(|(word, positions)| {
            positions
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|p| p.as_u64())
                .map(move |p| (p, word.as_str()))
        })
        .collect();
    positioned.sort_by_key(|(p, _)| *p);
    positioned.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rebuild_abstract() {
        let index = json!({"henge": [1], "A": [0], "survey.": [3], "timber": [2]});
        assert_eq!(rebuild_abstract(index.as_object().unwrap()), "A henge timber survey.");
    }

    #[test]
    fn test_work_to_citation() {
        let work = json!({
            "doi": "https://doi.org/10.1017/S0003598X00064640",
            "title": "Stone circles of the Atlantic fringe",
            "type": "article",
            "publication_year": 1995,
            "publication_date": "1995-06-01",
            "authorships": [{"author": {"display_name": "Aubrey Burl"}}],
            "primary_location": {
                "landing_page_url": "https://www.cambridge.org/core/article/abc",
                "source": {"display_name": "Antiquity", "host_organization_name": "Cambridge University Press"}
            },
            "biblio": {"volume": "69", "issue": "263", "first_page": "255", "last_page": "270"},
            "abstract_inverted_index": null
        });
        let c = work_to_citation(&work);
        assert_eq!(c.kind, CitationKind::Article);
        assert_eq!(c.authors[0].family.as_deref(), Some("Burl"));
        assert_eq!(c.pages.as_deref(), Some("255-270"));
        assert_eq!(c.container_title.as_deref(), Some("Antiquity"));
        assert_eq!(c.publisher.as_deref(), Some("Cambridge University Press"));
        assert_eq!(c.url.as_deref(), Some("https://www.cambridge.org/core/article/abc"));
        assert!(c.abstract_text.is_none());
    }
}
