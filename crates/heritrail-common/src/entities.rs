/// Citation entities shared by the resolver, the ranker and the web layer.
/// Field names follow the JSON the admin bibliography editor stores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Citation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Article,
    Book,
    Chapter,
    Webpage,
    Report,
    Thesis,
    #[default]
    Other,
}

impl CitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationKind::Article => "article",
            CitationKind::Book    => "book",
            CitationKind::Chapter => "chapter",
            CitationKind::Webpage => "webpage",
            CitationKind::Report  => "report",
            CitationKind::Thesis  => "thesis",
            CitationKind::Other   => "other",
        }
    }

    /// Map the type vocabularies used by the metadata providers
    /// (Crossref, OpenAlex, Zotero, schema.org) onto our kinds.
    pub fn from_provider_type(raw: &str) -> Self {
        let t = raw.to_lowercase();
        let t = t.trim();
        match t {
            "journal-article" | "article" | "journalarticle" | "journal_article"
            | "proceedings-article" | "conferencepaper" | "scholarlyarticle"
            | "posted-content" | "preprint" | "newsarticle" | "magazinearticle"
            | "newspaperarticle" => CitationKind::Article,
            "book" | "monograph" | "edited-book" | "reference-book" | "book-set" => CitationKind::Book,
            "book-chapter" | "book-section" | "booksection" | "chapter" | "book-part" => CitationKind::Chapter,
            "webpage" | "web-page" | "website" | "blogpost" | "blog-post" | "blogposting" => CitationKind::Webpage,
            "report" | "standard" | "dataset" => CitationKind::Report,
            "thesis" | "dissertation" => CitationKind::Thesis,
            _ => CitationKind::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Institutional or otherwise unsplittable names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Author {
    pub fn display_name(&self) -> String {
        match (&self.given, &self.family, &self.literal) {
            (Some(g), Some(f), _) => format!("{g} {f}"),
            (None, Some(f), _)    => f.clone(),
            (Some(g), None, _)    => g.clone(),
            (None, None, Some(l)) => l.clone(),
            (None, None, None)    => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name().trim().is_empty()
    }
}

/// Common citation schema every provider response is normalised into.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub kind: CitationKind,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub issued: Option<NaiveDate>,
    /// Journal, book (for chapters) or website name.
    pub container_title: Option<String>,
    pub publisher: Option<String>,
    pub publisher_place: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    /// Lowercase, prefix-free DOI once normalised.
    pub doi: Option<String>,
    /// ISBN-13 values once normalised.
    #[serde(default)]
    pub isbns: Vec<String>,
    pub url: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

impl Citation {
    pub fn has_identifier(&self) -> bool {
        self.doi.is_some() || !self.isbns.is_empty()
    }

    /// True when the provider returned nothing worth keeping.
    pub fn is_blank(&self) -> bool {
        self.title.as_deref().map(str::trim).unwrap_or("").is_empty() && !self.has_identifier()
    }

    /// Smallest ISBN; stable regardless of provider order.
    pub fn primary_isbn(&self) -> Option<&str> {
        self.isbns.iter().min().map(String::as_str)
    }

    /// Title with subtitle appended, as shown in reference lists.
    pub fn full_title(&self) -> Option<String> {
        match (&self.title, &self.subtitle) {
            (Some(t), Some(s)) if !s.is_empty() => Some(format!("{t}: {s}")),
            (Some(t), _) => Some(t.clone()),
            (None, _) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Metadata providers consulted by the resolver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DoiRegistry,
    OpenAlex,
    CitationExtractor,
    GoogleBooks,
    OpenLibrary,
    HtmlMeta,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DoiRegistry       => "doi_registry",
            SourceKind::OpenAlex          => "open_alex",
            SourceKind::CitationExtractor => "citation_extractor",
            SourceKind::GoogleBooks       => "google_books",
            SourceKind::OpenLibrary       => "open_library",
            SourceKind::HtmlMeta          => "html_meta",
        }
    }

    /// Field precedence when merging duplicates; lower wins.
    pub fn precedence(&self) -> u8 {
        match self {
            SourceKind::DoiRegistry       => 0,
            SourceKind::OpenAlex          => 1,
            SourceKind::CitationExtractor => 2,
            SourceKind::GoogleBooks       => 3,
            SourceKind::OpenLibrary       => 4,
            SourceKind::HtmlMeta          => 5,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "doi_registry" | "crossref"              => Some(SourceKind::DoiRegistry),
            "open_alex" | "openalex"                 => Some(SourceKind::OpenAlex),
            "citation_extractor" | "zotero"          => Some(SourceKind::CitationExtractor),
            "google_books" | "googlebooks"           => Some(SourceKind::GoogleBooks),
            "open_library" | "openlibrary"           => Some(SourceKind::OpenLibrary),
            "html_meta" | "html"                     => Some(SourceKind::HtmlMeta),
            _ => None,
        }
    }

    pub fn all() -> [SourceKind; 6] {
        [
            SourceKind::DoiRegistry,
            SourceKind::OpenAlex,
            SourceKind::CitationExtractor,
            SourceKind::GoogleBooks,
            SourceKind::OpenLibrary,
            SourceKind::HtmlMeta,
        ]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a provider was queried, which bounds how much its answer can be trusted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Exact lookup by DOI or ISBN.
    Identifier,
    /// Free-text search; hits may be unrelated.
    Search,
    /// Metadata read off the page the user pasted.
    Page,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceHit {
    pub source: SourceKind,
    pub mode: QueryMode,
    /// Similarity in [0, 1] between the query and the hit's title, for searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_similarity: Option<f64>,
    /// The hit carries the exact identifier the user typed.
    pub identifier_match: bool,
}

/// A ranked resolver result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub key: String,
    pub citation: Citation,
    pub hits: Vec<SourceHit>,
    pub confidence: f64,
    pub richness: f64,
    pub score: f64,
    pub formatted: String,
}

impl Candidate {
    pub fn new(citation: Citation, hit: SourceHit) -> Self {
        Self {
            key: String::new(),
            citation,
            hits: vec![hit],
            confidence: 0.0,
            richness: 0.0,
            score: 0.0,
            formatted: String::new(),
        }
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        let mut out: Vec<SourceKind> = Vec::new();
        for hit in &self.hits {
            if !out.contains(&hit.source) {
                out.push(hit.source);
            }
        }
        out
    }

    pub fn has_source(&self, source: SourceKind) -> bool {
        self.hits.iter().any(|h| h.source == source)
    }

    /// Highest-precedence contributing source.
    pub fn primary_source(&self) -> Option<SourceKind> {
        self.hits.iter().map(|h| h.source).min_by_key(|s| s.precedence())
    }
}
