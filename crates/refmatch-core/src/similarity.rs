//! Approximate title matching for records that missed an exact key.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::grouping::DisjointSet;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.90;

/// Character-level title measure used by the fuzzy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleMetric {
    /// `2 * M / T` over matching blocks (Ratcliff/Obershelp).
    #[default]
    Sequence,
    /// Normalized Levenshtein distance.
    Levenshtein,
}

impl TitleMetric {
    pub fn ratio(self, a: &str, b: &str) -> f64 {
        match self {
            Self::Sequence => sequence_ratio(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
        }
    }
}

/// Similarity in [0, 1] from the longest common blocks of `a` and `b`.
///
/// The longest matching block is found first, then the same search runs
/// recursively on the pieces to its left and right. Two empty strings are
/// identical.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut ranges = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = ranges.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            ranges.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            ranges.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Earliest longest block shared by `a[alo..ahi]` and `b[blo..bhi]`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_lengths = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let previous = match j.checked_sub(1) {
                    Some(prev) => run_lengths.get(&prev).copied().unwrap_or(0),
                    None => 0,
                };
                let size = previous + 1;
                next_lengths.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_lengths = next_lengths;
    }

    (best_i, best_j, best_size)
}

/// A title-keyed exact group offered to the fuzzy pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FuzzyCandidate<'a> {
    pub position: usize,
    pub title: &'a str,
    pub year: &'a str,
}

/// Two candidates merged by the fuzzy pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMerge {
    pub left: usize,
    pub right: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityResolver {
    threshold: f64,
    metric: TitleMetric,
}

impl Default for SimilarityResolver {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            metric: TitleMetric::default(),
        }
    }
}

impl SimilarityResolver {
    pub fn new(threshold: f64, metric: TitleMetric) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            metric,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> TitleMetric {
        self.metric
    }

    pub fn titles_match(&self, a: &str, b: &str) -> Option<f64> {
        if a.is_empty() || b.is_empty() {
            return None;
        }
        let ratio = self.metric.ratio(a, b);
        (ratio >= self.threshold).then_some(ratio)
    }

    /// Merge candidates whose titles are near-identical within one year.
    ///
    /// Candidates are bucketed by normalized year and compared only inside a
    /// bucket. Unknown years never take part.
    pub(crate) fn resolve(
        &self,
        candidates: &[FuzzyCandidate<'_>],
        sets: &mut DisjointSet,
    ) -> Vec<FuzzyMerge> {
        let mut buckets: BTreeMap<&str, Vec<&FuzzyCandidate<'_>>> = BTreeMap::new();
        for candidate in candidates {
            if candidate.year == crate::normalize::UNKNOWN_YEAR {
                continue;
            }
            buckets.entry(candidate.year).or_default().push(candidate);
        }

        let mut merges = Vec::new();
        for (year, bucket) in &buckets {
            debug!(year, candidates = bucket.len(), "fuzzy bucket");
            for (idx, left) in bucket.iter().enumerate() {
                for right in &bucket[idx + 1..] {
                    if sets.find(left.position) == sets.find(right.position) {
                        continue;
                    }
                    if let Some(ratio) = self.titles_match(left.title, right.title) {
                        trace!(left = left.title, right = right.title, ratio, "fuzzy merge");
                        sets.union(left.position, right.position);
                        merges.push(FuzzyMerge {
                            left: left.position,
                            right: right.position,
                            ratio,
                        });
                    }
                }
            }
        }

        merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate<'a>(position: usize, title: &'a str, year: &'a str) -> FuzzyCandidate<'a> {
        FuzzyCandidate {
            position,
            title,
            year,
        }
    }

    #[test]
    fn sequence_ratio_of_identical_titles_is_one() {
        assert_eq!(sequence_ratio("machinelearning", "machinelearning"), 1.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
    }

    #[test]
    fn sequence_ratio_counts_blocks_on_both_sides_of_longest_match() {
        // "machinelear" + "ing" = 14 of 29 characters.
        let ratio = sequence_ratio("machinelearning", "machinelearing");
        assert!((ratio - 28.0 / 29.0).abs() < 1e-12);
    }

    #[test]
    fn sequence_ratio_hits_threshold_exactly() {
        assert_eq!(sequence_ratio("abcdefghij", "abcdefghix"), 0.9);
        assert!(sequence_ratio("abcdefghi", "abcdefghx") < 0.9);
    }

    #[test]
    fn sequence_ratio_of_disjoint_titles_is_zero() {
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn levenshtein_metric_is_available() {
        let ratio = TitleMetric::Levenshtein.ratio("kitten", "sitten");
        assert!((ratio - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn titles_match_applies_inclusive_threshold() {
        let resolver = SimilarityResolver::default();
        assert_eq!(resolver.titles_match("abcdefghij", "abcdefghix"), Some(0.9));
        assert_eq!(resolver.titles_match("abcdefghi", "abcdefghx"), None);
        assert_eq!(resolver.titles_match("", ""), None);
    }

    #[test]
    fn resolve_only_compares_within_a_year() {
        let resolver = SimilarityResolver::default();
        let candidates = [
            candidate(0, "machinelearning", "2023"),
            candidate(1, "machinelearing", "2024"),
            candidate(2, "machinelearing", "2023"),
        ];
        let mut sets = DisjointSet::new(3);

        let merges = resolver.resolve(&candidates, &mut sets);

        assert_eq!(merges.len(), 1);
        assert_eq!((merges[0].left, merges[0].right), (0, 2));
        assert_eq!(sets.find(0), sets.find(2));
        assert_ne!(sets.find(0), sets.find(1));
    }

    #[test]
    fn resolve_skips_unknown_years() {
        let resolver = SimilarityResolver::default();
        let candidates = [
            candidate(0, "machinelearning", "unknown"),
            candidate(1, "machinelearing", "unknown"),
        ];
        let mut sets = DisjointSet::new(2);

        assert!(resolver.resolve(&candidates, &mut sets).is_empty());
        assert_ne!(sets.find(0), sets.find(1));
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(SimilarityResolver::new(1.7, TitleMetric::Sequence).threshold(), 1.0);
        assert_eq!(SimilarityResolver::new(-0.2, TitleMetric::Sequence).threshold(), 0.0);
    }
}
