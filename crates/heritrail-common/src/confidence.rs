/// Confidence scoring for resolver hits.
/// Each provider hit gets a confidence from its base weight and match modifiers;
/// hits merged into one candidate are combined with noisy-OR.

/// Modifiers describing how well a single hit matches the query.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceModifiers {
    /// Title similarity in [0, 1] for free-text searches.
    pub title_similarity: Option<f64>,
    /// The hit carries the identifier the user typed.
    pub identifier_match: bool,
    /// The hit has no title at all.
    pub missing_title: bool,
    /// The hit has no authors/creators.
    pub missing_authors: bool,
}

/// Compute final confidence given base weight and modifiers.
/// Returns value in [0.0, 1.0].
pub fn compute_confidence(base_weight: f64, mods: &ConfidenceModifiers) -> f64 {
    let mut confidence = base_weight;

    // Search hits are only as good as their title match
    if let Some(sim) = mods.title_similarity {
        confidence *= sim.clamp(0.0, 1.0).powi(2);
    }

    if mods.identifier_match {
        confidence *= 1.10;
    }

    if mods.missing_title {
        confidence *= 0.60;
    }

    if mods.missing_authors {
        confidence *= 0.90;
    }

    confidence.clamp(0.0, 1.0)
}

/// Aggregate confidence from multiple independent sources
/// using the noisy-OR model: p = 1 - Π(1 - p_i)
pub fn aggregate_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    let product: f64 = confidences.iter().map(|&p| 1.0 - p.clamp(0.0, 1.0)).product();
    1.0 - product
}
