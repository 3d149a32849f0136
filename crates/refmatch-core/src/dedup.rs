//! Multi-source deduplication with provenance.

use std::cmp::Reverse;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::MatchConfig;
use crate::confidence::MatchDecision;
use crate::error::{MatchError, Result};
use crate::grouping::resolve_groups;
use crate::normalize::{UNKNOWN_YEAR, normalize_year};
use crate::record::{Annotated, ReferenceRecord};

/// Representative of a group, kept in the deduplicated output.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueReference {
    pub record: ReferenceRecord,
    pub identity: String,
    pub source_file: String,
    pub appears_in: Vec<String>,
    pub occurrence_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Non-master member of a group, removed from the output.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedDuplicate {
    pub record: ReferenceRecord,
    pub identity: String,
    pub source_file: String,
    pub duplicate_of: String,
    pub all_sources: Vec<String>,
    pub occurrence_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<MatchDecision>,
}

impl Annotated for UniqueReference {
    fn record(&self) -> &ReferenceRecord {
        &self.record
    }

    fn provenance(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("source_file", self.source_file.clone()),
            ("appears_in", self.appears_in.join("; ")),
            ("occurrence_count", self.occurrence_count.to_string()),
        ];
        if let Some(confidence) = self.confidence {
            fields.push(("confidence", format!("{confidence:.3}")));
        }
        fields
    }
}

impl Annotated for RemovedDuplicate {
    fn record(&self) -> &ReferenceRecord {
        &self.record
    }

    fn provenance(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("source_file", self.source_file.clone()),
            ("duplicate_of", self.duplicate_of.clone()),
            ("all_sources", self.all_sources.join("; ")),
            ("occurrence_count", self.occurrence_count.to_string()),
        ];
        if let Some(decision) = self.decision {
            fields.push(("confidence", format!("{:.3}", decision.confidence)));
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeduplicationResult {
    pub unique: Vec<UniqueReference>,
    pub removed_duplicates: Vec<RemovedDuplicate>,
    /// Distinct source labels in input order, including empty sources.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub label: String,
    pub contributed: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeduplicationStats {
    pub total_input: usize,
    pub unique_count: usize,
    pub duplicate_count: usize,
    pub reduction_percent: f64,
    pub num_sources: usize,
    pub per_source: Vec<SourceStats>,
}

/// Order of the entries in a [`DeduplicationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportOrder {
    /// Groups in order of their master's position.
    #[default]
    FirstSeen,
    /// Unique entries newest first, then by title descending; removed
    /// entries by source label. Unknown years go last.
    YearTitle,
}

impl FromStr for ReportOrder {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "first-seen" => Ok(Self::FirstSeen),
            "year-title" | "year" => Ok(Self::YearTitle),
            other => Err(format!(
                "unknown order '{other}' (expected first-seen or year-title)"
            )),
        }
    }
}

impl DeduplicationResult {
    /// Reorder entries for reporting. Statistics are unaffected.
    pub fn sort_for_report(&mut self, order: ReportOrder) {
        match order {
            ReportOrder::FirstSeen => {}
            ReportOrder::YearTitle => {
                self.unique
                    .sort_by_cached_key(|entry| Reverse(year_title_key(&entry.record)));
                self.removed_duplicates
                    .sort_by(|a, b| a.source_file.cmp(&b.source_file));
            }
        }
    }

    pub fn stats(&self) -> DeduplicationStats {
        let total_input = self.unique.len() + self.removed_duplicates.len();
        let duplicate_count = self.removed_duplicates.len();

        let per_source = self
            .sources
            .iter()
            .map(|label| {
                let kept = self
                    .unique
                    .iter()
                    .filter(|entry| &entry.source_file == label)
                    .count();
                let removed = self
                    .removed_duplicates
                    .iter()
                    .filter(|entry| &entry.source_file == label)
                    .count();
                SourceStats {
                    label: label.clone(),
                    contributed: kept + removed,
                    removed,
                }
            })
            .collect();

        let reduction_percent = if total_input == 0 {
            0.0
        } else {
            duplicate_count as f64 / total_input as f64 * 100.0
        };

        DeduplicationStats {
            total_input,
            unique_count: self.unique.len(),
            duplicate_count,
            reduction_percent,
            num_sources: self.sources.len(),
            per_source,
        }
    }
}

fn year_title_key(record: &ReferenceRecord) -> (bool, String, String) {
    let year = normalize_year(record.year.as_ref());
    let title = record.title.clone().unwrap_or_default();
    (year != UNKNOWN_YEAR, year, title)
}

/// Pool every source, resolve groups, and keep the first-seen member.
///
/// Records are tagged with their source label before matching. The master
/// of a group is its earliest member in input order, so callers that need
/// a particular precedence must order `sources` accordingly.
pub fn deduplicate_sources<L: AsRef<str>>(
    sources: &[(L, Vec<ReferenceRecord>)],
    config: &MatchConfig,
) -> Result<DeduplicationResult> {
    let mut labels: Vec<String> = Vec::new();
    let mut pool: Vec<ReferenceRecord> = Vec::new();

    for (label, records) in sources {
        let label = label.as_ref();
        if label.trim().is_empty() {
            return Err(MatchError::InvalidInput(
                "source label must not be empty".to_string(),
            ));
        }
        if labels.iter().any(|known| known == label) {
            warn!(source = label, "repeated source label, records are counted under one source");
        } else {
            labels.push(label.to_string());
        }
        if records.is_empty() {
            warn!(source = label, "source contributed no records");
            continue;
        }
        pool.extend(records.iter().cloned().map(|record| record.with_source(label)));
    }

    let groups = resolve_groups(&pool, config)?;

    let mut result = DeduplicationResult {
        sources: labels,
        ..Default::default()
    };

    for group in groups {
        let occurrence_count = group.occurrence_count();
        let confidence = group.confidence();
        let master_label = group.master().record.source_label.clone();

        let mut members = group.members.into_iter();
        let Some(master) = members.next() else {
            continue;
        };

        for member in members {
            result.removed_duplicates.push(RemovedDuplicate {
                source_file: member.record.source_label.clone(),
                record: member.record,
                identity: group.identity.clone(),
                duplicate_of: master_label.clone(),
                all_sources: group.sources.clone(),
                occurrence_count,
                decision: member.decision,
            });
        }

        result.unique.push(UniqueReference {
            source_file: master_label,
            record: master.record,
            identity: group.identity,
            appears_in: group.sources,
            occurrence_count,
            confidence,
        });
    }

    let stats = result.stats();
    info!(
        total = stats.total_input,
        unique = stats.unique_count,
        duplicates = stats.duplicate_count,
        sources = stats.num_sources,
        "deduplicated sources"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, year: &str) -> ReferenceRecord {
        ReferenceRecord::new(title).with_year(year)
    }

    #[test]
    fn keeps_first_seen_member_as_master() {
        let sources = vec![
            ("a.ris", vec![record("Shared", "2020"), record("Only A", "2020")]),
            ("b.ris", vec![record("Shared", "2020"), record("Only B", "2020")]),
        ];

        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();

        assert_eq!(result.unique.len(), 3);
        assert_eq!(result.removed_duplicates.len(), 1);

        let shared = &result.unique[0];
        assert_eq!(shared.source_file, "a.ris");
        assert_eq!(shared.appears_in, vec!["a.ris", "b.ris"]);
        assert_eq!(shared.occurrence_count, 2);

        let removed = &result.removed_duplicates[0];
        assert_eq!(removed.source_file, "b.ris");
        assert_eq!(removed.duplicate_of, "a.ris");
        assert_eq!(removed.all_sources, vec!["a.ris", "b.ris"]);
    }

    #[test]
    fn singletons_report_their_own_source() {
        let sources = vec![("only.ris", vec![record("Lonely", "2001")])];

        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();

        assert_eq!(result.unique[0].appears_in, vec!["only.ris"]);
        assert_eq!(result.unique[0].occurrence_count, 1);
        assert_eq!(result.unique[0].confidence, None);
    }

    #[test]
    fn stats_include_empty_sources() {
        let sources = vec![
            ("a.ris", vec![record("Shared", "2020")]),
            ("empty.ris", vec![]),
            ("b.ris", vec![record("Shared", "2020"), record("New", "2020")]),
        ];

        let stats = deduplicate_sources(&sources, &MatchConfig::default())
            .unwrap()
            .stats();

        assert_eq!(stats.total_input, 3);
        assert_eq!(stats.unique_count, 2);
        assert_eq!(stats.duplicate_count, 1);
        assert_eq!(stats.num_sources, 3);
        assert!((stats.reduction_percent - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            stats.per_source,
            vec![
                SourceStats {
                    label: "a.ris".to_string(),
                    contributed: 1,
                    removed: 0,
                },
                SourceStats {
                    label: "empty.ris".to_string(),
                    contributed: 0,
                    removed: 0,
                },
                SourceStats {
                    label: "b.ris".to_string(),
                    contributed: 2,
                    removed: 1,
                },
            ]
        );
    }

    #[test]
    fn tags_records_with_source_label() {
        let sources = vec![("labelled.ris", vec![record("Tagged", "2020").with_source("stale")])];

        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();

        assert_eq!(result.unique[0].record.source_label, "labelled.ris");
    }

    #[test]
    fn empty_label_is_invalid_input() {
        let sources = vec![("  ", vec![record("Tagged", "2020")])];
        let err = deduplicate_sources(&sources, &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
    }

    #[test]
    fn provenance_lists_engine_fields() {
        let sources = vec![
            ("a.ris", vec![record("Shared", "2020")]),
            ("b.ris", vec![record("Shared", "2020")]),
        ];
        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();

        let unique_fields: Vec<&str> = result.unique[0]
            .provenance()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            unique_fields,
            vec!["source_file", "appears_in", "occurrence_count", "confidence"]
        );

        let removed = result.removed_duplicates[0].provenance();
        assert!(removed.contains(&("duplicate_of", "a.ris".to_string())));
    }

    #[test]
    fn year_title_order_puts_newest_first_and_unknown_last() {
        let sources = vec![
            (
                "b.ris",
                vec![
                    record("Undated", "in press"),
                    record("Alpha", "2019"),
                    record("Beta", "2021"),
                    record("Gamma", "2021"),
                ],
            ),
            ("a.ris", vec![record("Alpha", "2019")]),
        ];
        let mut result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();
        let stats = result.stats();

        result.sort_for_report(ReportOrder::YearTitle);

        let titles: Vec<&str> = result
            .unique
            .iter()
            .filter_map(|entry| entry.record.title.as_deref())
            .collect();
        assert_eq!(titles, vec!["Gamma", "Beta", "Alpha", "Undated"]);
        assert_eq!(result.removed_duplicates[0].source_file, "a.ris");
        assert_eq!(result.stats(), stats);
    }

    #[test]
    fn first_seen_order_is_left_alone() {
        let sources = vec![("a.ris", vec![record("Old", "1990"), record("New", "2020")])];
        let mut result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();
        result.sort_for_report(ReportOrder::FirstSeen);
        assert_eq!(result.unique[0].record.title.as_deref(), Some("Old"));
    }

    #[test]
    fn report_order_parses_from_text() {
        assert_eq!("year".parse::<ReportOrder>(), Ok(ReportOrder::YearTitle));
        assert_eq!("first-seen".parse::<ReportOrder>(), Ok(ReportOrder::FirstSeen));
        assert!("random".parse::<ReportOrder>().is_err());
    }

    #[test]
    fn repeated_labels_share_one_source() {
        let sources = vec![
            ("refs.ris", vec![record("Alpha", "2020")]),
            ("refs.ris", vec![record("Alpha", "2020")]),
        ];
        let stats = deduplicate_sources(&sources, &MatchConfig::default())
            .unwrap()
            .stats();
        assert_eq!(stats.num_sources, 1);
        assert_eq!(stats.per_source[0].contributed, 2);
    }

    #[test]
    fn no_sources_yield_empty_result() {
        let sources: Vec<(&str, Vec<ReferenceRecord>)> = Vec::new();
        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();
        assert!(result.unique.is_empty());
        assert_eq!(result.stats().reduction_percent, 0.0);
    }
}
