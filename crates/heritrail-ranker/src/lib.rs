//! heritrail-ranker — Candidate scoring for the bibliography resolver.
//! score = w_conf × confidence + w_rich × richness, ordered deterministically.

pub mod weights;
pub mod scorer;

pub use scorer::{Ranker, RankerSettings};
pub use weights::{RichnessWeights, ScoreWeights};
