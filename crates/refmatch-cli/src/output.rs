use std::fmt::Write;

use refmatch_core::{ComparisonResult, DeduplicationResult, ReferenceRecord};
use refmatch_search::SearchOutcome;

use crate::analyze::Analysis;

const UNTITLED: &str = "(untitled)";

fn title_of(record: &ReferenceRecord) -> &str {
    record
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNTITLED)
}

fn push_titles<'a>(
    out: &mut String,
    heading: &str,
    records: impl Iterator<Item = &'a ReferenceRecord>,
) {
    let titles: Vec<&str> = records.map(title_of).collect();
    let _ = writeln!(out, "\n{heading} ({}):", titles.len());
    for title in titles {
        let _ = writeln!(out, "  {title}");
    }
}

pub fn render_comparison(result: &ComparisonResult, label_a: &str, label_b: &str) -> String {
    let stats = result.stats();
    let mut out = String::new();
    let _ = writeln!(out, "Comparison of {label_a} and {label_b}:");
    let _ = writeln!(out, "  Total in {label_a}:  {}", stats.total_a);
    let _ = writeln!(out, "  Total in {label_b}:  {}", stats.total_b);
    let _ = writeln!(out, "  Overlap:        {}", stats.overlap_count);
    let _ = writeln!(out, "  Fuzzy matches:  {}", stats.fuzzy_matches);
    let _ = writeln!(out, "  Unique to {label_a}: {}", stats.unique_a_count);
    let _ = writeln!(out, "  Unique to {label_b}: {}", stats.unique_b_count);

    push_titles(&mut out, "Overlap", result.overlap_records());
    push_titles(&mut out, &format!("Only in {label_a}"), result.unique_a_records());
    push_titles(&mut out, &format!("Only in {label_b}"), result.unique_b_records());
    out
}

pub fn render_dedup(result: &DeduplicationResult) -> String {
    let stats = result.stats();
    let mut out = String::new();
    let _ = writeln!(out, "Deduplication statistics:");
    let _ = writeln!(out, "  Sources:     {}", stats.num_sources);
    let _ = writeln!(out, "  Total input: {}", stats.total_input);
    let _ = writeln!(out, "  Unique:      {}", stats.unique_count);
    let _ = writeln!(
        out,
        "  Duplicates:  {} ({:.1}%)",
        stats.duplicate_count, stats.reduction_percent
    );
    let _ = writeln!(out, "\nPer source:");
    for source in &stats.per_source {
        let _ = writeln!(
            out,
            "  {:<30} {} records, {} removed",
            source.label, source.contributed, source.removed
        );
    }
    out
}

pub fn render_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total references: {}", analysis.total);

    let _ = writeln!(out, "\nBy year:");
    for year in &analysis.years {
        let _ = writeln!(out, "  {:<8} {}", year.name, year.count);
    }

    let _ = writeln!(out, "\nTop authors:");
    for author in &analysis.top_authors {
        let _ = writeln!(out, "  {:<40} {}", author.name, author.count);
    }

    let _ = writeln!(out, "\nTop journals:");
    for journal in &analysis.top_journals {
        let _ = writeln!(out, "  {:<40} {}", journal.name, journal.count);
    }
    out
}

pub fn render_search(outcome: &SearchOutcome, label: &str) -> String {
    let stats = &outcome.stats;
    let fields: Vec<&str> = stats.fields.iter().map(|field| field.as_str()).collect();
    let mut out = String::new();
    let _ = writeln!(out, "Search in {label}:");
    let _ = writeln!(out, "  Query:     {}", stats.query);
    let _ = writeln!(out, "  Fields:    {}", fields.join(", "));
    let _ = writeln!(
        out,
        "  Matched:   {} of {} ({:.2}%)",
        stats.matched, stats.total, stats.match_percentage
    );

    let _ = writeln!(out, "\nMatches ({}):", outcome.hits.len());
    for hit in &outcome.hits {
        let title = hit
            .highlighted_title
            .as_deref()
            .unwrap_or_else(|| title_of(&hit.record));
        let _ = writeln!(out, "  {title}");
        let _ = writeln!(
            out,
            "      {} terms: {}",
            hit.match_count,
            hit.matched_terms.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use refmatch_core::{MatchConfig, compare_records, deduplicate_sources};

    use super::*;
    use crate::analyze::analyze;

    #[test]
    fn comparison_lists_titles_per_set() {
        let a = vec![ReferenceRecord::new("Shared").with_year(2020), ReferenceRecord::new("Left")];
        let b = vec![ReferenceRecord::new("Shared").with_year(2020)];
        let result = compare_records(&a, &b, &MatchConfig::default()).unwrap();

        let text = render_comparison(&result, "a.ris", "b.ris");
        assert!(text.contains("Overlap:        1"));
        assert!(text.contains("Only in a.ris (1):\n  Left"));
        assert!(text.contains("Only in b.ris (0):"));
    }

    #[test]
    fn dedup_report_shows_reduction() {
        let shared = ReferenceRecord::new("Shared").with_year(2020);
        let sources = vec![("a.ris", vec![shared.clone()]), ("b.ris", vec![shared])];
        let result = deduplicate_sources(&sources, &MatchConfig::default()).unwrap();

        let text = render_dedup(&result);
        assert!(text.contains("Duplicates:  1 (50.0%)"));
        assert!(text.contains("b.ris"));
    }

    #[test]
    fn untitled_records_get_placeholder() {
        let record = ReferenceRecord::default().with_identifier("10.1/x");
        assert_eq!(title_of(&record), UNTITLED);
    }

    #[test]
    fn search_report_marks_titles() {
        let records = vec![ReferenceRecord::new("Risk of Bias Tools"), ReferenceRecord::new("Other")];
        let outcome =
            refmatch_search::search_records(&records, "bias", &refmatch_search::SearchField::DEFAULT)
                .unwrap();

        let text = render_search(&outcome, "refs.ris");
        assert!(text.contains("  Matched:   1 of 2 (50.00%)"));
        assert!(text.contains("  Risk of <mark>Bias</mark> Tools\n      1 terms: Bias"));
    }

    #[test]
    fn analysis_report_has_sections() {
        let text = render_analysis(&analyze(&[ReferenceRecord::new("One").with_year(2001)]));
        assert!(text.starts_with("Total references: 1"));
        assert!(text.contains("  2001     1"));
    }
}
