//! Weight vectors for candidate scoring.

use serde::{Deserialize, Serialize};

/// How much each metadata field contributes to a citation's richness.
/// Weights sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichnessWeights {
    pub title: f64,
    pub authors: f64,
    pub year: f64,
    /// Journal, book or site name, or a publisher.
    pub container: f64,
    /// DOI or ISBN.
    pub identifier: f64,
    pub url: f64,
    /// Volume, issue or pages.
    pub locator: f64,
    pub abstract_text: f64,
}

impl Default for RichnessWeights {
    fn default() -> Self {
        Self {
            title:         0.25,
            authors:       0.20,
            year:          0.10,
            container:     0.10,
            identifier:    0.15,
            url:           0.05,
            locator:       0.05,
            abstract_text: 0.10,
        }
    }
}

impl RichnessWeights {
    fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Validate that all weights are non-negative and sum to ~1.0
    pub fn validate(&self) -> bool {
        self.as_array().iter().all(|w| *w >= 0.0) && (self.sum() - 1.0).abs() < 1e-6
    }

    /// Renormalise weights so they sum to 1.0
    pub fn normalise(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            self.title         /= sum;
            self.authors       /= sum;
            self.year          /= sum;
            self.container     /= sum;
            self.identifier    /= sum;
            self.url           /= sum;
            self.locator       /= sum;
            self.abstract_text /= sum;
        }
    }

    pub fn as_array(&self) -> [f64; 8] {
        [
            self.title,
            self.authors,
            self.year,
            self.container,
            self.identifier,
            self.url,
            self.locator,
            self.abstract_text,
        ]
    }
}

/// Blend between confidence and richness in the final score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub confidence: f64,
    pub richness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { confidence: 0.7, richness: 0.3 }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> bool {
        self.confidence >= 0.0 && self.richness >= 0.0
            && (self.confidence + self.richness - 1.0).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(RichnessWeights::default().validate(), "Default weights must sum to 1.0");
        assert!(ScoreWeights::default().validate());
    }

    #[test]
    fn test_normalise_restores_sum() {
        let mut w = RichnessWeights::default();
        w.abstract_text += 0.30; // deliberately break sum
        assert!(!w.validate());
        w.normalise();
        assert!(w.validate());
    }

    #[test]
    fn test_negative_weight_is_invalid() {
        let w = RichnessWeights { url: -0.05, title: 0.35, ..Default::default() };
        assert!(!w.validate());
    }
}
