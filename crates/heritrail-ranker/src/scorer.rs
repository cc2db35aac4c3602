//! Candidate scoring and ordering.
//!
//! score = w_conf × confidence + w_rich × richness
//!
//! `rank` is a pure function of the candidates it is given: identical input
//! yields identical output order.

use std::cmp::Ordering;

use heritrail_common::confidence::{aggregate_confidence, compute_confidence, ConfidenceModifiers};
use heritrail_common::{Candidate, Citation, QueryMode, SourceHit, SourceKind};
use heritrail_config::RankingConfig;

use crate::weights::{RichnessWeights, ScoreWeights};

/// Share of the populated, weighted metadata fields. Returns value in [0.0, 1.0].
pub fn richness(citation: &Citation, weights: &RichnessWeights) -> f64 {
    let present = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);

    let fields = [
        present(&citation.title),
        citation.authors.iter().any(|a| !a.is_empty()),
        citation.year.is_some(),
        present(&citation.container_title) || present(&citation.publisher),
        citation.has_identifier(),
        present(&citation.url),
        present(&citation.volume) || present(&citation.issue) || present(&citation.pages),
        present(&citation.abstract_text),
    ];

    let score: f64 = fields
        .iter()
        .zip(weights.as_array().iter())
        .filter(|(has, _)| **has)
        .map(|(_, w)| w)
        .sum();
    score.clamp(0.0, 1.0)
}

/// Prior trust in a provider's answer, given how it was asked.
pub fn base_confidence(source: SourceKind, mode: QueryMode) -> f64 {
    match (mode, source) {
        (QueryMode::Identifier, SourceKind::DoiRegistry)       => 0.95,
        (QueryMode::Identifier, SourceKind::OpenAlex)          => 0.85,
        (QueryMode::Identifier, SourceKind::OpenLibrary)       => 0.85,
        (QueryMode::Identifier, SourceKind::GoogleBooks)       => 0.80,
        (QueryMode::Identifier, SourceKind::CitationExtractor) => 0.80,
        (QueryMode::Identifier, SourceKind::HtmlMeta)          => 0.50,

        (QueryMode::Search, SourceKind::DoiRegistry)           => 0.60,
        (QueryMode::Search, SourceKind::OpenAlex)              => 0.55,
        (QueryMode::Search, SourceKind::GoogleBooks)           => 0.55,
        (QueryMode::Search, SourceKind::OpenLibrary)           => 0.50,
        (QueryMode::Search, SourceKind::CitationExtractor)     => 0.50,
        (QueryMode::Search, SourceKind::HtmlMeta)              => 0.40,

        (QueryMode::Page, SourceKind::CitationExtractor)       => 0.80,
        (QueryMode::Page, SourceKind::HtmlMeta)                => 0.70,
        (QueryMode::Page, _)                                   => 0.60,
    }
}

/// Confidence of a single provider hit for the merged citation.
pub fn hit_confidence(citation: &Citation, hit: &SourceHit) -> f64 {
    let mods = ConfidenceModifiers {
        title_similarity: match hit.mode {
            QueryMode::Search => hit.title_similarity,
            _ => None,
        },
        identifier_match: hit.identifier_match,
        missing_title: citation.title.as_deref().map(str::trim).unwrap_or("").is_empty(),
        missing_authors: !citation.authors.iter().any(|a| !a.is_empty()),
    };
    compute_confidence(base_confidence(hit.source, hit.mode), &mods)
}

/// Noisy-OR over every contributing hit.
pub fn candidate_confidence(candidate: &Candidate) -> f64 {
    let per_hit: Vec<f64> = candidate
        .hits
        .iter()
        .map(|h| hit_confidence(&candidate.citation, h))
        .collect();
    aggregate_confidence(&per_hit).clamp(0.0, 1.0)
}

pub fn composite_score(confidence: f64, richness: f64, weights: &ScoreWeights) -> f64 {
    (weights.confidence * confidence + weights.richness * richness).clamp(0.0, 1.0)
}

/// Score descending, then confidence descending, then key ascending.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.key.cmp(&b.key))
}

#[derive(Debug, Clone)]
pub struct RankerSettings {
    pub richness: RichnessWeights,
    pub score: ScoreWeights,
    pub min_score: f64,
    pub max_candidates: usize,
}

impl Default for RankerSettings {
    fn default() -> Self {
        Self::from(&RankingConfig::default())
    }
}

impl From<&RankingConfig> for RankerSettings {
    fn from(cfg: &RankingConfig) -> Self {
        Self {
            richness: RichnessWeights::default(),
            score: ScoreWeights { confidence: cfg.confidence_weight, richness: cfg.richness_weight },
            min_score: cfg.min_score,
            max_candidates: cfg.max_candidates,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    settings: RankerSettings,
}

impl Ranker {
    pub fn new(mut settings: RankerSettings) -> Self {
        if !settings.richness.validate() {
            tracing::warn!("Richness weights do not sum to 1.0; renormalising");
            settings.richness.normalise();
        }
        Self { settings }
    }

    /// Fill confidence, richness, score and the formatted reference on one candidate.
    pub fn score(&self, candidate: &mut Candidate) {
        candidate.confidence = candidate_confidence(candidate);
        candidate.richness = richness(&candidate.citation, &self.settings.richness);
        candidate.score = composite_score(candidate.confidence, candidate.richness, &self.settings.score);
        candidate.formatted = candidate.citation.formatted();
    }

    /// Score, order and cut the candidate list.
    ///
    /// Candidates below `min_score` are dropped unless a provider matched the
    /// exact identifier the user typed.
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        for c in candidates.iter_mut() {
            self.score(c);
        }

        let before = candidates.len();
        candidates.retain(|c| {
            c.score >= self.settings.min_score || c.hits.iter().any(|h| h.identifier_match)
        });

        candidates.sort_by(compare_candidates);
        candidates.truncate(self.settings.max_candidates);

        tracing::debug!(
            scored = before,
            kept = candidates.len(),
            "Ranked candidates"
        );
        candidates
    }
}
