use serde::Serialize;

use crate::similarity::DEFAULT_FUZZY_THRESHOLD;

pub const IDENTIFIER_CONFIDENCE: f64 = 0.999;
pub const EXACT_CONFIDENCE: f64 = 0.95;
pub const FUZZY_CONFIDENCE_FLOOR: f64 = 0.85;
pub const FUZZY_CONFIDENCE_CEILING: f64 = 0.90;

/// Which stage of the waterfall matched two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Identifier,
    ExactTitleYear,
    Fuzzy,
}

/// Advisory confidence for a match. Never used to decide a merge.
///
/// Fuzzy matches scale linearly across the fuzzy band and stay below the
/// exact-match score. A fuzzy match without a ratio scores the band floor.
pub fn score(tier: MatchTier, similarity_ratio: Option<f64>) -> f64 {
    match tier {
        MatchTier::Identifier => IDENTIFIER_CONFIDENCE,
        MatchTier::ExactTitleYear => EXACT_CONFIDENCE,
        MatchTier::Fuzzy => {
            let ratio = similarity_ratio.unwrap_or(DEFAULT_FUZZY_THRESHOLD);
            let band = FUZZY_CONFIDENCE_CEILING - FUZZY_CONFIDENCE_FLOOR;
            let scaled = FUZZY_CONFIDENCE_FLOOR
                + band * (ratio - DEFAULT_FUZZY_THRESHOLD) / (1.0 - DEFAULT_FUZZY_THRESHOLD);
            scaled.clamp(FUZZY_CONFIDENCE_FLOOR, FUZZY_CONFIDENCE_CEILING)
        }
    }
}

/// The match between one record and the record it was grouped with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchDecision {
    pub tier: MatchTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    pub confidence: f64,
}

impl MatchDecision {
    pub fn new(tier: MatchTier, similarity: Option<f64>) -> Self {
        Self {
            tier,
            similarity,
            confidence: score(tier, similarity),
        }
    }
}
