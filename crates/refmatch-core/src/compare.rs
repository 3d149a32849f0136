//! Binary comparison of two record collections.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::config::MatchConfig;
use crate::confidence::{MatchDecision, MatchTier};
use crate::error::Result;
use crate::grouping::{GroupMember, MatchGroup, decide, resolve_groups};
use crate::record::ReferenceRecord;
use crate::similarity::TitleMetric;

/// One resolved identity and the records each side contributed to it.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityMatch {
    pub identity: String,
    pub records_a: Vec<ReferenceRecord>,
    pub records_b: Vec<ReferenceRecord>,
    /// Match between the first A record and the first B record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<MatchDecision>,
}

impl IdentityMatch {
    pub fn is_fuzzy(&self) -> bool {
        self.decision
            .is_some_and(|decision| decision.tier == MatchTier::Fuzzy)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    pub overlap: Vec<IdentityMatch>,
    pub unique_a: Vec<IdentityMatch>,
    pub unique_b: Vec<IdentityMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ComparisonStats {
    pub total_a: usize,
    pub total_b: usize,
    /// Overlapping records, counted on the A side.
    pub overlap_count: usize,
    pub unique_a_count: usize,
    pub unique_b_count: usize,
    pub fuzzy_matches: usize,
}

impl ComparisonResult {
    /// A-side records of every overlapping identity.
    pub fn overlap_records(&self) -> impl Iterator<Item = &ReferenceRecord> {
        self.overlap.iter().flat_map(|entry| entry.records_a.iter())
    }

    pub fn unique_a_records(&self) -> impl Iterator<Item = &ReferenceRecord> {
        self.unique_a.iter().flat_map(|entry| entry.records_a.iter())
    }

    pub fn unique_b_records(&self) -> impl Iterator<Item = &ReferenceRecord> {
        self.unique_b.iter().flat_map(|entry| entry.records_b.iter())
    }

    pub fn stats(&self) -> ComparisonStats {
        let count_a = |entries: &[IdentityMatch]| -> usize {
            entries.iter().map(|entry| entry.records_a.len()).sum()
        };
        let count_b = |entries: &[IdentityMatch]| -> usize {
            entries.iter().map(|entry| entry.records_b.len()).sum()
        };

        ComparisonStats {
            total_a: count_a(&self.overlap) + count_a(&self.unique_a),
            total_b: count_b(&self.overlap) + count_b(&self.unique_b),
            overlap_count: count_a(&self.overlap),
            unique_a_count: count_a(&self.unique_a),
            unique_b_count: count_b(&self.unique_b),
            fuzzy_matches: self.overlap.iter().filter(|entry| entry.is_fuzzy()).count(),
        }
    }
}

/// Resolve the union of both sides, then split identities by side.
pub fn compare_records(
    records_a: &[ReferenceRecord],
    records_b: &[ReferenceRecord],
    config: &MatchConfig,
) -> Result<ComparisonResult> {
    let pool: Vec<ReferenceRecord> = records_a.iter().chain(records_b).cloned().collect();
    let groups = resolve_groups(&pool, config)?;
    let split = records_a.len();

    let mut identities_a = BTreeSet::new();
    let mut identities_b = BTreeSet::new();
    for (idx, group) in groups.iter().enumerate() {
        if group.members.iter().any(|member| member.position < split) {
            identities_a.insert(idx);
        }
        if group.members.iter().any(|member| member.position >= split) {
            identities_b.insert(idx);
        }
    }

    let metric = config.fuzzy.metric;
    let collect = |indexes: Vec<&usize>| -> Vec<IdentityMatch> {
        indexes
            .into_iter()
            .map(|idx| identity_match(&groups[*idx], split, metric))
            .collect()
    };

    let result = ComparisonResult {
        overlap: collect(identities_a.intersection(&identities_b).collect()),
        unique_a: collect(identities_a.difference(&identities_b).collect()),
        unique_b: collect(identities_b.difference(&identities_a).collect()),
    };

    let stats = result.stats();
    info!(
        total_a = stats.total_a,
        total_b = stats.total_b,
        overlap = stats.overlap_count,
        unique_a = stats.unique_a_count,
        unique_b = stats.unique_b_count,
        fuzzy = stats.fuzzy_matches,
        "compared collections"
    );

    Ok(result)
}

fn identity_match(
    group: &MatchGroup,
    split: usize,
    metric: TitleMetric,
) -> IdentityMatch {
    let (side_a, side_b): (Vec<&GroupMember>, Vec<&GroupMember>) = group
        .members
        .iter()
        .partition(|member| member.position < split);

    let decision = match (side_a.first(), side_b.first()) {
        (Some(a), Some(b)) => Some(decide(a, b, metric)),
        _ => None,
    };

    IdentityMatch {
        identity: group.identity.clone(),
        records_a: side_a.iter().map(|member| member.record.clone()).collect(),
        records_b: side_b.iter().map(|member| member.record.clone()).collect(),
        decision,
    }
}
