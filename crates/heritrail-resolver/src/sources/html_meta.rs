//! Generic HTML metadata scraping, the fallback for pasted URLs.
//!
//! Reads, in order of trust:
//! 1. Highwire `citation_*` meta tags (used by most journal and repository sites)
//! 2. JSON-LD `ScholarlyArticle` / `Book` / `Article` blocks
//! 3. Dublin Core `dc.*` meta tags
//! 4. OpenGraph `og:*` tags and the plain `<title>`
//!
//! The page URL comes from the user, so it is fetched through the SSRF-guarded
//! `get_public` path.

use std::collections::HashMap;

use async_trait::async_trait;
use heritrail_common::{Author, Citation, CitationKind, QueryMode, SandboxClient, SourceKind};
use lazy_static::lazy_static;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{check_status, MetadataSource};
use crate::error::{ResolverError, Result};
use crate::models::{ClassifiedInput, InputKind};
use crate::normalise::{extract_year, normalise_author, normalise_doi, parse_issued};

/// Pages larger than this are cut before parsing; the rest is never read.
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

lazy_static! {
    static ref META: Selector = Selector::parse("meta[content]").unwrap();
    static ref JSON_LD: Selector = Selector::parse("script[type='application/ld+json']").unwrap();
    static ref TITLE: Selector = Selector::parse("title").unwrap();
    static ref CANONICAL: Selector = Selector::parse("link[rel='canonical'][href]").unwrap();
    static ref HTML_ROOT: Selector = Selector::parse("html[lang]").unwrap();
}

/// JSON-LD types worth reading, most specific first.
const LD_TYPES: &[&str] = &[
    "ScholarlyArticle", "Book", "Chapter", "Thesis", "Report", "Article",
    "NewsArticle", "BlogPosting", "CreativeWork", "WebPage",
];

pub struct HtmlMetaClient {
    client: SandboxClient,
}

impl HtmlMetaClient {
    pub fn new(client: SandboxClient) -> Self {
        Self { client }
    }

    /// Final URL (after redirects) and page text; `None` for non-HTML responses.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, url: &str) -> Result<Option<(String, String)>> {
        let resp = self.client.get_public(url)?.send().await?;
        let Some(mut resp) = check_status(SourceKind::HtmlMeta, resp)? else {
            return Ok(None);
        };

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_lowercase();
        if !content_type.contains("html") {
            debug!(%content_type, "Not an HTML page; nothing to scrape");
            return Ok(None);
        }

        let declared_len = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > MAX_PAGE_BYTES * 4) {
            return Err(ResolverError::Provider {
                provider: SourceKind::HtmlMeta,
                message: "page is too large to scrape".to_string(),
            });
        }

        let final_url = resp.url().to_string();
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let room = MAX_PAGE_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(limit = MAX_PAGE_BYTES, "Page cut at the scrape limit");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Some((final_url, String::from_utf8_lossy(&body).into_owned())))
    }
}

#[async_trait]
impl MetadataSource for HtmlMetaClient {
    fn kind(&self) -> SourceKind {
        SourceKind::HtmlMeta
    }

    fn supports(&self, input: &ClassifiedInput) -> bool {
        input.kind == InputKind::Url
    }

    fn mode(&self, _input: &ClassifiedInput) -> QueryMode {
        QueryMode::Page
    }

    async fn lookup(&self, input: &ClassifiedInput, _limit: usize) -> Result<Vec<Citation>> {
        let Some(url) = &input.url else {
            return Ok(Vec::new());
        };
        let Some((final_url, html)) = self.fetch_page(url).await? else {
            return Ok(Vec::new());
        };
        let citation = extract_metadata(&html, &final_url);
        if citation.is_blank() {
            return Ok(Vec::new());
        }
        Ok(vec![citation])
    }
}

// ── Extraction ─────────────────────────────────────────────────────────────

/// Meta tags keyed by lowercase `name`/`property`/`itemprop`, values in page order.
struct MetaTags(HashMap<String, Vec<String>>);

impl MetaTags {
    fn collect(doc: &Html) -> Self {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for el in doc.select(&META) {
            let attrs = el.value();
            let Some(content) = attrs.attr("content").map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            for key_attr in ["name", "property", "itemprop"] {
                if let Some(key) = attrs.attr(key_attr) {
                    map.entry(key.trim().to_lowercase())
                        .or_default()
                        .push(content.to_string());
                }
            }
        }
        Self(map)
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.0.get(*k).and_then(|v| v.first().cloned()))
    }

    fn all(&self, key: &str) -> Vec<String> {
        self.0.get(key).cloned().unwrap_or_default()
    }

    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// Build a citation from whatever metadata the page carries.
pub fn extract_metadata(html: &str, page_url: &str) -> Citation {
    let doc = Html::parse_document(html);
    let meta = MetaTags::collect(&doc);
    let ld = json_ld(&doc);
    let ld = ld.as_ref();

    let title = meta
        .first(&["citation_title"])
        .or_else(|| ld.and_then(|l| ld_str(l, &["headline", "name"])))
        .or_else(|| meta.first(&["dc.title", "dcterms.title", "og:title", "twitter:title"]))
        .or_else(|| {
            doc.select(&TITLE)
                .next()
                .map(|t| t.text().collect::<String>())
                .filter(|t| !t.trim().is_empty())
        });

    let mut authors: Vec<Author> = meta.all("citation_author").iter().map(|a| normalise_author(a)).collect();
    if authors.is_empty() {
        authors = ld.map(|l| ld_people(&l["author"])).unwrap_or_default();
    }
    if authors.is_empty() {
        for key in ["dc.creator", "dcterms.creator", "author", "article:author"] {
            authors = meta
                .all(key)
                .iter()
                .filter(|a| !a.starts_with("http"))
                .map(|a| normalise_author(a))
                .collect();
            if !authors.is_empty() {
                break;
            }
        }
    }

    let date = meta
        .first(&["citation_publication_date", "citation_date", "citation_online_date"])
        .or_else(|| ld.and_then(|l| ld_str(l, &["datePublished", "dateCreated"])))
        .or_else(|| meta.first(&["dc.date", "dcterms.date", "dcterms.issued", "article:published_time", "citation_year"]));

    let container = meta
        .first(&["citation_journal_title", "citation_conference_title", "citation_book_title", "citation_inbook_title"])
        .or_else(|| ld.and_then(|l| ld_name(&l["isPartOf"])))
        .or_else(|| meta.first(&["og:site_name"]));

    let publisher = meta
        .first(&["citation_publisher", "dc.publisher", "dcterms.publisher"])
        .or_else(|| ld.and_then(|l| ld_name(&l["publisher"])));

    let pages = match (meta.first(&["citation_firstpage"]), meta.first(&["citation_lastpage"])) {
        (Some(f), Some(l)) => Some(format!("{f}-{l}")),
        (Some(f), None) => Some(f),
        _ => None,
    };

    let doi = meta
        .first(&["citation_doi", "prism.doi", "dc.identifier", "dcterms.identifier"])
        .and_then(|d| normalise_doi(&d))
        .or_else(|| ld.and_then(ld_doi));

    let mut isbns = meta.all("citation_isbn");
    if isbns.is_empty() {
        isbns = ld.map(|l| ld_strings(&l["isbn"])).unwrap_or_default();
    }

    let canonical = doc
        .select(&CANONICAL)
        .next()
        .and_then(|l| l.value().attr("href"))
        .and_then(|href| Url::parse(page_url).ok()?.join(href).ok())
        .map(|u| u.to_string());
    let url = canonical
        .or_else(|| meta.first(&["og:url"]))
        .unwrap_or_else(|| page_url.to_string());

    let language = meta
        .first(&["citation_language", "dc.language", "dcterms.language"])
        .or_else(|| {
            doc.select(&HTML_ROOT)
                .next()
                .and_then(|h| h.value().attr("lang"))
                .map(String::from)
        });

    let abstract_text = meta
        .first(&["citation_abstract", "dc.description", "dcterms.abstract"])
        .or_else(|| ld.and_then(|l| ld_str(l, &["abstract", "description"])))
        .or_else(|| meta.first(&["og:description", "description"]));

    let kind = if meta.has("citation_journal_title") {
        CitationKind::Article
    } else if meta.has("citation_inbook_title") || meta.has("citation_book_title") {
        CitationKind::Chapter
    } else if meta.has("citation_dissertation_institution") {
        CitationKind::Thesis
    } else if meta.has("citation_technical_report_institution") {
        CitationKind::Report
    } else if let Some(t) = ld.and_then(ld_type) {
        match CitationKind::from_provider_type(&t) {
            CitationKind::Other => CitationKind::Webpage,
            k => k,
        }
    } else if !isbns.is_empty() {
        CitationKind::Book
    } else {
        CitationKind::Webpage
    };

    Citation {
        kind,
        title,
        authors,
        year: date.as_deref().and_then(extract_year),
        issued: date.as_deref().and_then(parse_issued),
        container_title: container,
        publisher,
        volume: meta.first(&["citation_volume", "prism.volume"]),
        issue: meta.first(&["citation_issue", "prism.number"]),
        pages,
        doi,
        isbns,
        url: Some(url),
        language,
        abstract_text,
        ..Default::default()
    }
}

// ── JSON-LD ────────────────────────────────────────────────────────────────

/// The most specific bibliographic JSON-LD node on the page.
fn json_ld(doc: &Html) -> Option<Value> {
    let mut nodes: Vec<Value> = Vec::new();
    for script in doc.select(&JSON_LD) {
        let text: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(text.trim()) else {
            continue;
        };
        flatten_ld(value, &mut nodes);
    }

    LD_TYPES.iter().find_map(|wanted| {
        nodes
            .iter()
            .find(|n| ld_type_names(n).iter().any(|t| t.as_str() == *wanted))
            .cloned()
    })
}

fn flatten_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|i| flatten_ld(i, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_ld(graph, out);
            }
            if map.contains_key("@type") {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn ld_type_names(node: &Value) -> Vec<String> {
    match &node["@type"] {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|i| i.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

fn ld_type(node: &Value) -> Option<String> {
    ld_type_names(node).into_iter().next()
}

fn ld_str(node: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match &node[*k] {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn ld_strings(v: &Value) -> Vec<String> {
    match v {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|i| i.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    }
}

/// `"Name"` or `{"name": "Name"}`.
fn ld_name(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => v["name"].as_str().map(String::from),
        Value::Array(items) => items.iter().find_map(ld_name),
        _ => None,
    }
}

fn ld_people(v: &Value) -> Vec<Author> {
    let person = |p: &Value| -> Option<Author> {
        match p {
            Value::String(s) => Some(normalise_author(s)),
            Value::Object(_) => match (p["givenName"].as_str(), p["familyName"].as_str()) {
                (given, Some(family)) => Some(Author {
                    given: given.map(String::from),
                    family: Some(family.to_string()),
                    literal: None,
                }),
                _ => {
                    let name = p["name"].as_str()?;
                    if p["@type"].as_str() == Some("Organization") {
                        Some(Author { literal: Some(name.to_string()), ..Default::default() })
                    } else {
                        Some(normalise_author(name))
                    }
                }
            },
            _ => None,
        }
    };
    match v {
        Value::Array(items) => items.iter().filter_map(person).collect(),
        other => person(other).into_iter().collect(),
    }
}

/// DOI from `identifier`/`sameAs`/`@id`, in any of their shapes.
fn ld_doi(node: &Value) -> Option<String> {
    let mut texts = Vec::new();
    for key in ["identifier", "sameAs", "@id", "url"] {
        match &node[key] {
            Value::String(s) => texts.push(s.clone()),
            Value::Array(items) => {
                for i in items {
                    if let Some(s) = i.as_str() {
                        texts.push(s.to_string());
                    } else if let Some(s) = i["value"].as_str() {
                        texts.push(s.to_string());
                    }
                }
            }
            Value::Object(_) => {
                if let Some(s) = node[key]["value"].as_str() {
                    texts.push(s.to_string());
                }
            }
            _ => {}
        }
    }
    texts.iter().find_map(|t| normalise_doi(t))
}
