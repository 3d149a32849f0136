use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::config::MatchConfig;
use crate::confidence::{MatchDecision, MatchTier};
use crate::error::{MatchError, Result};
use crate::key::{MatchKey, key_for};
use crate::normalize::NormalizedFields;
use crate::record::ReferenceRecord;
use crate::similarity::{FuzzyCandidate, TitleMetric};

/// One record inside a [`MatchGroup`], with everything derived for it.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    /// Index of the record in the batch that was resolved.
    pub position: usize,
    pub record: ReferenceRecord,
    pub key: MatchKey,
    pub normalized: NormalizedFields,
    /// How this member matched the master. `None` for the master itself.
    pub decision: Option<MatchDecision>,
}

/// Records judged to denote one work.
///
/// Members are in input order and never empty; the first one is the master.
#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    pub identity: String,
    pub members: Vec<GroupMember>,
    /// Distinct source labels in first-seen order.
    pub sources: Vec<String>,
}

impl MatchGroup {
    pub fn master(&self) -> &GroupMember {
        &self.members[0]
    }

    pub fn duplicates(&self) -> &[GroupMember] {
        &self.members[1..]
    }

    pub fn occurrence_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_unique(&self) -> bool {
        self.members.len() == 1
    }

    /// Weakest member-to-master confidence, `None` for singletons.
    pub fn confidence(&self) -> Option<f64> {
        self.members
            .iter()
            .filter_map(|member| member.decision.map(|decision| decision.confidence))
            .reduce(f64::min)
    }

    pub fn matched_fuzzily(&self) -> bool {
        self.members
            .iter()
            .filter_map(|member| member.decision)
            .any(|decision| decision.tier == MatchTier::Fuzzy)
    }
}

/// Classify the match between two members of the same group.
pub fn decide(left: &GroupMember, right: &GroupMember, metric: TitleMetric) -> MatchDecision {
    match (&left.key, &right.key) {
        (MatchKey::Identifier(a), MatchKey::Identifier(b)) if a == b => {
            MatchDecision::new(MatchTier::Identifier, None)
        }
        (MatchKey::TitleYear { .. }, _) if left.key == right.key => {
            MatchDecision::new(MatchTier::ExactTitleYear, None)
        }
        _ => {
            let ratio = metric.ratio(&left.normalized.title, &right.normalized.title);
            MatchDecision::new(MatchTier::Fuzzy, Some(ratio))
        }
    }
}

/// Partition `records` into match groups.
///
/// Exact keys are grouped first; the fuzzy pass then merges title-keyed
/// groups when enabled. Groups come back ordered by their master's position.
pub fn resolve_groups(records: &[ReferenceRecord], config: &MatchConfig) -> Result<Vec<MatchGroup>> {
    config.validate()?;
    for (position, record) in records.iter().enumerate() {
        if !record.exposes_any_field() {
            return Err(MatchError::InvalidInput(format!(
                "record {position} from '{}' exposes none of title, authors, year or identifier",
                record.source_label
            )));
        }
    }

    let normalized: Vec<NormalizedFields> =
        records.iter().map(NormalizedFields::from_record).collect();
    let keys: Vec<MatchKey> = normalized.iter().map(key_for).collect();

    let mut sets = DisjointSet::new(records.len());
    let mut buckets: HashMap<&MatchKey, Vec<usize>> = HashMap::new();
    for (position, key) in keys.iter().enumerate() {
        if key.is_matchable() {
            buckets.entry(key).or_default().push(position);
        }
    }

    let mut exact_merges = 0usize;
    for positions in buckets.values() {
        if let Some((first, rest)) = positions.split_first() {
            for position in rest {
                sets.union(*first, *position);
                exact_merges += 1;
            }
        }
    }

    let fuzzy_merges = match config.resolver() {
        Some(resolver) => {
            let mut candidates: Vec<FuzzyCandidate<'_>> = buckets
                .iter()
                .filter_map(|(key, positions)| match key {
                    MatchKey::TitleYear { title, year } => {
                        positions.first().map(|position| FuzzyCandidate {
                            position: *position,
                            title,
                            year,
                        })
                    }
                    _ => None,
                })
                .collect();
            candidates.sort_by_key(|candidate| candidate.position);
            resolver.resolve(&candidates, &mut sets).len()
        }
        None => 0,
    };

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut member_positions: Vec<Vec<usize>> = Vec::new();
    for position in 0..records.len() {
        let root = sets.find(position);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            member_positions.push(Vec::new());
            member_positions.len() - 1
        });
        member_positions[slot].push(position);
    }

    let metric = config.fuzzy.metric;
    let groups: Vec<MatchGroup> = member_positions
        .into_iter()
        .map(|positions| build_group(&positions, records, &normalized, &keys, metric))
        .collect();

    debug!(
        records = records.len(),
        exact_merges,
        fuzzy_merges,
        groups = groups.len(),
        "resolved match groups"
    );

    Ok(groups)
}

fn build_group(
    positions: &[usize],
    records: &[ReferenceRecord],
    normalized: &[NormalizedFields],
    keys: &[MatchKey],
    metric: TitleMetric,
) -> MatchGroup {
    let mut members: Vec<GroupMember> = positions
        .iter()
        .map(|&position| GroupMember {
            position,
            record: records[position].clone(),
            key: keys[position].clone(),
            normalized: normalized[position].clone(),
            decision: None,
        })
        .collect();

    if let Some((master, rest)) = members.split_first_mut() {
        for member in rest {
            member.decision = Some(decide(master, member, metric));
        }
    }

    let mut sources: Vec<String> = Vec::new();
    for member in &members {
        if !sources.contains(&member.record.source_label) {
            sources.push(member.record.source_label.clone());
        }
    }

    let identity = match members.first() {
        Some(master) if master.key.is_matchable() => master.key.to_string(),
        Some(master) => format!("NK:{}", master.position),
        None => String::new(),
    };

    MatchGroup {
        identity,
        members,
        sources,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    pub(crate) fn union(&mut self, left: usize, right: usize) {
        let left_root = self.find(left);
        let right_root = self.find(right);

        if left_root == right_root {
            return;
        }

        let left_rank = self.rank[left_root];
        let right_rank = self.rank[right_root];

        if left_rank < right_rank {
            self.parent[left_root] = right_root;
        } else if left_rank > right_rank {
            self.parent[right_root] = left_root;
        } else {
            self.parent[right_root] = left_root;
            self.rank[left_root] += 1;
        }
    }
}
