//! Crossref DOI registry client.
//!
//! API: {base}/works/{doi} for lookups, {base}/works?query.bibliographic= for searches.
//! Polite pool: pass `mailto` (see Crossref etiquette).

use async_trait::async_trait;
use chrono::NaiveDate;
use heritrail_common::{Author, Citation, CitationKind, SandboxClient, SourceKind};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_status, str_or_first, strings, trim_base, MetadataSource};
use crate::error::Result;
use crate::models::{ClassifiedInput, InputKind};

const SELECT_FIELDS: &str = "DOI,ISBN,URL,title,subtitle,author,editor,issued,published,\
    container-title,publisher,publisher-location,volume,issue,page,language,abstract,type";

pub struct CrossrefClient {
    client: SandboxClient,
    base: String,
    mailto: Option<String>,
}

impl CrossrefClient {
    pub fn new(client: SandboxClient, base: &str, mailto: Option<String>) -> Self {
        Self { client, base: trim_base(base), mailto }
    }

    /// Resolve a single DOI. `None` when Crossref does not know it.
    #[instrument(skip(self))]
    pub async fn resolve_doi(&self, doi: &str) -> Result<Option<Citation>> {
        let url = format!("{}/works/{}", self.base, doi);
        let mut req = self.client.get(&url)?;
        if let Some(m) = &self.mailto {
            req = req.query(&[("mailto", m.as_str())]);
        }
        let Some(resp) = check_status(SourceKind::DoiRegistry, req.send().await?)? else {
            return Ok(None);
        };
        let body: Value = resp.json().await?;
        Ok(Some(work_to_citation(&body["message"])))
    }

    /// Free-text bibliographic search.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, rows: usize) -> Result<Vec<Citation>> {
        let url = format!("{}/works", self.base);
        let rows = rows.to_string();
        let mut params = vec![
            ("query.bibliographic", query),
            ("rows", rows.as_str()),
            ("select", SELECT_FIELDS),
        ];
        if let Some(m) = &self.mailto {
            params.push(("mailto", m.as_str()));
        }
        let resp = self.client.get(&url)?.query(&params).send().await?;
        let Some(resp) = check_status(SourceKind::DoiRegistry, resp)? else {
            return Ok(Vec::new());
        };
        let body: Value = resp.json().await?;
        let items = body["message"]["items"].as_array().cloned().unwrap_or_default();
        debug!(n = items.len(), "Crossref search results");
        Ok(items.iter().map(work_to_citation).collect())
    }
}

#[async_trait]
impl MetadataSource for CrossrefClient {
    fn kind(&self) -> SourceKind {
        SourceKind::DoiRegistry
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
            (Some(doi), _) => Ok(self.resolve_doi(doi).await?.into_iter().collect()),
            (None, InputKind::Title) => self.search(&input.text, limit).await,
            _ => Ok(Vec::new()),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn work_to_citation(work: &Value) -> Citation {
    let mut authors: Vec<Author> = people(&work["author"]);
    if authors.is_empty() {
        authors = people(&work["editor"]);
    }

    let issued = date_parts(&work["issued"]).or_else(|| date_parts(&work["published"]));

    Citation {
        kind: work["type"]
            .as_str()
            .map(CitationKind::from_provider_type)
            .unwrap_or_default(),
        title: str_or_first(&work["title"]),
        subtitle: str_or_first(&work["subtitle"]),
        authors,
        year: issued.map(|(y, _)| y),
        issued: issued.and_then(|(_, d)| d),
        container_title: str_or_first(&work["container-title"]),
        publisher: work["publisher"].as_str().map(String::from),
        publisher_place: work["publisher-location"].as_str().map(String::from),
        volume: str_or_first(&work["volume"]),
        issue: str_or_first(&work["issue"]),
        pages: work["page"].as_str().map(String::from),
        doi: work["DOI"].as_str().map(String::from),
        isbns: strings(&work["ISBN"]),
        url: work["URL"].as_str().map(String::from),
        language: work["language"].as_str().map(String::from),
        // JATS markup is removed by normalisation
        abstract_text: work["abstract"].as_str().map(String::from),
    }
}

fn people(list: &Value) -> Vec<Author> {
    list.as_array()
        .map(|people| {
            people
                .iter()
                .map(|p| Author {
                    given: p["given"].as_str().map(String::from),
                    family: p["family"].as_str().map(String::from),
                    literal: p["name"].as_str().map(String::from),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `{"date-parts": [[2019, 5, 1]]}` → year plus the full date when it has a month.
fn date_parts(v: &Value) -> Option<(i32, Option<NaiveDate>)> {
    let parts = v["date-parts"].as_array()?.first()?.as_array()?;
    let year = parts.first()?.as_i64()? as i32;
    let date = parts.get(1).and_then(|m| m.as_u64()).and_then(|month| {
        let day = parts.get(2).and_then(|d| d.as_u64()).unwrap_or(1) as u32;
        NaiveDate::from_ymd_opt(year, month as u32, day)
    });
    Some((year, date))
}
