//! End-to-end resolution of one user input.
//!
//!   1. Classify the input (DOI, ISBN, URL or title)
//!   2. Query every provider that supports the input, concurrently, each under its own timeout
//!   3. Normalise citations and attach provenance
//!   4. Guarantee a DOI-registry candidate for DOI input
//!   5. Deduplicate, score and rank
//!
//! Provider failures never fail the request; they are reported per provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use heritrail_common::{Candidate, Citation, CitationKind, QueryMode, SandboxClient, SourceHit, SourceKind};
use heritrail_config::{Config, ResolverConfig};
use heritrail_ranker::{Ranker, RankerSettings};
use strsim::jaro_winkler;
use tracing::{debug, info, instrument, warn};

use crate::classify::{classify_with_limit, DEFAULT_MAX_INPUT_LEN};
use crate::dedup::{deduplicate, DEFAULT_TITLE_THRESHOLD};
use crate::error::{ResolverError, Result};
use crate::models::{ClassifiedInput, InputKind, ProviderOutcome, ProviderReport, Resolution};
use crate::normalise::{normalise_title, CitationExt};
use crate::sources::{build_sources, MetadataSource};

const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub provider_timeout: Duration,
    pub per_provider_limit: usize,
    pub max_input_len: usize,
    pub title_merge_threshold: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(8),
            per_provider_limit: 5,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            title_merge_threshold: DEFAULT_TITLE_THRESHOLD,
        }
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(cfg: &ResolverConfig) -> Self {
        Self {
            provider_timeout: cfg.provider_timeout(),
            per_provider_limit: cfg.per_provider_limit,
            max_input_len: cfg.max_input_len,
            title_merge_threshold: cfg.title_merge_threshold,
        }
    }
}

pub struct Resolver {
    sources: Vec<Arc<dyn MetadataSource>>,
    ranker: Ranker,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(sources: Vec<Arc<dyn MetadataSource>>, ranker: Ranker, settings: ResolverSettings) -> Self {
        Self { sources, ranker, settings }
    }

    /// Build the providers, HTTP client and ranker from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let rc = &config.resolver;
        // Crossref and OpenAlex route polite traffic by the contact address
        let user_agent = match &rc.mailto {
            Some(mailto) => format!("{} (mailto:{})", rc.user_agent, mailto),
            None => rc.user_agent.clone(),
        };
        // The pipeline's own timeout fires first and is what providers report
        let client = SandboxClient::new(
            &rc.endpoints.all(),
            rc.provider_timeout() + CLIENT_TIMEOUT_MARGIN,
            &user_agent,
            rc.allow_private_hosts,
        )?;

        let sources = build_sources(rc, &client);
        if sources.is_empty() {
            return Err(ResolverError::Config("no metadata providers enabled".to_string()));
        }
        info!(
            providers = ?sources.iter().map(|s| s.kind().as_str()).collect::<Vec<_>>(),
            "Resolver ready"
        );

        Ok(Self::new(
            sources,
            Ranker::new(RankerSettings::from(&config.ranking)),
            ResolverSettings::from(rc),
        ))
    }

    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    #[instrument(skip(self, input), fields(len = input.len()))]
    pub async fn resolve(&self, input: &str) -> Result<Resolution> {
        let started = Instant::now();
        let query = classify_with_limit(input, self.settings.max_input_len)?;
        debug!(kind = query.kind.as_str(), "Classified input");

        let lookups = self
            .sources
            .iter()
            .filter(|s| s.supports(&query))
            .map(|s| self.run_provider(s.as_ref(), &query));
        let results = join_all(lookups).await;

        let mut providers = Vec::with_capacity(results.len());
        let mut pool = Vec::new();
        for (report, candidates) in results {
            providers.push(report);
            pool.extend(candidates);
        }

        if let Some(stub) = doi_registry_stub(&query, &pool) {
            debug!("No DOI registry hit; adding identifier-only candidate");
            pool.push(stub);
        }

        let pooled = pool.len();
        let merged = deduplicate(pool, self.settings.title_merge_threshold);
        let candidates = self.ranker.rank(merged);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            kind = query.kind.as_str(),
            pooled,
            candidates = candidates.len(),
            elapsed_ms,
            "Resolved bibliography input"
        );

        Ok(Resolution {
            input: query.raw,
            kind: query.kind,
            candidates,
            providers,
            elapsed_ms,
        })
    }

    async fn run_provider(
        &self,
        source: &dyn MetadataSource,
        query: &ClassifiedInput,
    ) -> (ProviderReport, Vec<Candidate>) {
        let kind = source.kind();
        let mode = source.mode(query);
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.settings.provider_timeout,
            source.lookup(query, self.settings.per_provider_limit),
        )
        .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (outcome, candidates, error) = match result {
            Ok(Ok(citations)) => {
                let candidates: Vec<Candidate> = citations
                    .into_iter()
                    .map(CitationExt::normalised)
                    .filter(|c| !c.is_blank())
                    .map(|c| {
                        let hit = source_hit(kind, mode, &c, query);
                        Candidate::new(c, hit)
                    })
                    .collect();
                (ProviderOutcome::Ok, candidates, None)
            }
            Ok(Err(e)) => {
                warn!(provider = %kind, error = %e, "Provider lookup failed");
                (ProviderOutcome::Error, Vec::new(), Some(e.to_string()))
            }
            Err(_) => {
                let timeout_ms = self.settings.provider_timeout.as_millis() as u64;
                warn!(provider = %kind, timeout_ms, "Provider timed out");
                (ProviderOutcome::Timeout, Vec::new(), Some("timed out".to_string()))
            }
        };

        debug!(provider = %kind, hits = candidates.len(), elapsed_ms, "Provider finished");
        let report = ProviderReport { source: kind, outcome, hits: candidates.len(), elapsed_ms, error };
        (report, candidates)
    }
}

/// Provenance for one normalised citation.
fn source_hit(source: SourceKind, mode: QueryMode, citation: &Citation, query: &ClassifiedInput) -> SourceHit {
    let doi_match = matches!((&query.doi, &citation.doi), (Some(q), Some(c)) if q == c);
    let isbn_match = query.isbn13.as_ref().is_some_and(|isbn| citation.isbns.contains(isbn));
    let title_similarity = match mode {
        QueryMode::Search => Some(title_similarity(&query.text, citation)),
        _ => None,
    };
    SourceHit { source, mode, title_similarity, identifier_match: doi_match || isbn_match }
}

/// Best Jaro-Winkler similarity between the query and the hit's title, with or
/// without its subtitle.
pub fn title_similarity(query: &str, citation: &Citation) -> f64 {
    let query = normalise_title(query);
    if query.is_empty() {
        return 0.0;
    }
    [citation.title.clone(), citation.full_title()]
        .into_iter()
        .flatten()
        .map(|t| normalise_title(&t))
        .filter(|t| !t.is_empty())
        .map(|t| jaro_winkler(&query, &t))
        .fold(0.0, f64::max)
}

/// A DOI typed by the user always yields a registry candidate, even when the
/// registry itself was down or did not answer in time.
fn doi_registry_stub(query: &ClassifiedInput, pool: &[Candidate]) -> Option<Candidate> {
    if query.kind != InputKind::Doi || pool.iter().any(|c| c.has_source(SourceKind::DoiRegistry)) {
        return None;
    }
    let doi = query.doi.clone()?;
    let citation = Citation {
        kind: CitationKind::Article,
        url: Some(format!("https://doi.org/{doi}")),
        doi: Some(doi),
        ..Default::default()
    };
    let hit = SourceHit {
        source: SourceKind::DoiRegistry,
        mode: QueryMode::Identifier,
        title_similarity: None,
        identifier_match: true,
    };
    Some(Candidate::new(citation, hit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use heritrail_common::Author;
    use pretty_assertions::assert_eq;

    /// Canned provider for pipeline tests.
    enum Behaviour {
        Returns(Vec<Citation>),
        Fails,
        Hangs,
    }

    struct FakeSource {
        kind: SourceKind,
        accepts: Vec<InputKind>,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn supports(&self, input: &ClassifiedInput) -> bool {
            self.accepts.contains(&input.kind)
        }

        async fn lookup(&self, _input: &ClassifiedInput, _limit: usize) -> Result<Vec<Citation>> {
            match &self.behaviour {
                Behaviour::Returns(c) => Ok(c.clone()),
                Behaviour::Fails => Err(ResolverError::Status { provider: self.kind, status: 503 }),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn fake(kind: SourceKind, accepts: &[InputKind], behaviour: Behaviour) -> Arc<dyn MetadataSource> {
        Arc::new(FakeSource { kind, accepts: accepts.to_vec(), behaviour })
    }

    fn resolver(sources: Vec<Arc<dyn MetadataSource>>) -> Resolver {
        let settings = ResolverSettings { provider_timeout: Duration::from_millis(100), ..Default::default() };
        Resolver::new(sources, Ranker::default(), settings)
    }

    fn article(doi: &str, title: &str) -> Citation {
        Citation {
            kind: CitationKind::Article,
            title: Some(title.into()),
            authors: vec![Author { given: Some("Ian".into()), family: Some("Hodder".into()), literal: None }],
            year: Some(1990),
            doi: Some(doi.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_doi_input_gets_registry_stub_when_registry_fails() {
        let r = resolver(vec![
            fake(SourceKind::DoiRegistry, &[InputKind::Doi], Behaviour::Fails),
            fake(SourceKind::OpenAlex, &[InputKind::Doi], Behaviour::Returns(vec![])),
        ]);
        let res = r.resolve("https://doi.org/10.1017/S0003598X00000001").await.unwrap();
        assert_eq!(res.kind, InputKind::Doi);
        assert_eq!(res.candidates.len(), 1);
        let c = &res.candidates[0];
        assert!(c.has_source(SourceKind::DoiRegistry));
        assert_eq!(c.citation.doi.as_deref(), Some("10.1017/s0003598x00000001"));
        assert_eq!(c.citation.url.as_deref(), Some("https://doi.org/10.1017/s0003598x00000001"));

        let outcomes: Vec<ProviderOutcome> = res.providers.iter().map(|p| p.outcome).collect();
        assert_eq!(outcomes, vec![ProviderOutcome::Error, ProviderOutcome::Ok]);
    }

    #[tokio::test]
    async fn test_registry_and_index_hits_merge_into_one_candidate() {
        let r = resolver(vec![
            fake(SourceKind::DoiRegistry, &[InputKind::Doi], Behaviour::Returns(vec![article("10.1000/xyz", "The Domestication of Europe")])),
            fake(SourceKind::OpenAlex, &[InputKind::Doi], Behaviour::Returns(vec![article("https://doi.org/10.1000/XYZ", "The domestication of Europe")])),
        ]);
        let res = r.resolve("10.1000/xyz").await.unwrap();
        assert_eq!(res.candidates.len(), 1);
        let c = &res.candidates[0];
        assert_eq!(c.sources(), vec![SourceKind::DoiRegistry, SourceKind::OpenAlex]);
        assert!(c.hits.iter().all(|h| h.identifier_match));
        assert!(c.confidence > 0.95);
        assert!(!c.formatted.is_empty());
    }

    #[tokio::test]
    async fn test_slow_provider_is_reported_as_timeout() {
        let r = resolver(vec![
            fake(SourceKind::OpenLibrary, &[InputKind::Title], Behaviour::Hangs),
            fake(
                SourceKind::GoogleBooks,
                &[InputKind::Title],
                Behaviour::Returns(vec![Citation {
                    kind: CitationKind::Book,
                    title: Some("Çatalhöyük".into()),
                    year: Some(2006),
                    ..Default::default()
                }]),
            ),
        ]);
        let res = r.resolve("Çatalhöyük").await.unwrap();
        assert_eq!(res.providers[0].outcome, ProviderOutcome::Timeout);
        assert_eq!(res.providers[1].outcome, ProviderOutcome::Ok);
        assert_eq!(res.providers[1].hits, 1);
        assert_eq!(res.candidates.len(), 1);
        assert_eq!(res.candidates[0].hits[0].title_similarity, Some(1.0));
    }

    #[tokio::test]
    async fn test_unsupported_providers_are_not_called() {
        let r = resolver(vec![
            fake(SourceKind::DoiRegistry, &[InputKind::Doi], Behaviour::Hangs),
            fake(SourceKind::HtmlMeta, &[InputKind::Url], Behaviour::Returns(vec![])),
        ]);
        let res = r.resolve("https://example.org/article").await.unwrap();
        assert_eq!(res.kind, InputKind::Url);
        assert_eq!(res.providers.len(), 1);
        assert_eq!(res.providers[0].source, SourceKind::HtmlMeta);
        assert!(res.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_input_errors_surface() {
        let r = resolver(vec![]);
        assert!(matches!(r.resolve("   ").await, Err(ResolverError::EmptyInput)));
        let long = "a".repeat(DEFAULT_MAX_INPUT_LEN + 1);
        assert!(r.resolve(&long).await.unwrap_err().is_input_error());
    }

    #[tokio::test]
    async fn test_ranking_is_stable_for_identical_inputs() {
        let books: Vec<Citation> = (0..6)
            .map(|i| Citation {
                kind: CitationKind::Book,
                title: Some(format!("Roman roads volume {i}")),
                year: Some(1950 + i),
                ..Default::default()
            })
            .collect();
        let r = resolver(vec![fake(SourceKind::OpenLibrary, &[InputKind::Title], Behaviour::Returns(books))]);
        let first: Vec<String> = r.resolve("Roman roads").await.unwrap().candidates.into_iter().map(|c| c.key).collect();
        let second: Vec<String> = r.resolve("Roman roads").await.unwrap().candidates.into_iter().map(|c| c.key).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_title_similarity_uses_subtitle_when_it_helps() {
        let c = Citation {
            title: Some("Petra".into()),
            subtitle: Some("Lost City of the Ancient World".into()),
            ..Default::default()
        };
        assert_eq!(title_similarity("Petra: lost city of the ancient world", &c), 1.0);
        assert_eq!(title_similarity("", &c), 0.0);
    }
}
