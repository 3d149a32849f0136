use std::collections::HashMap;

use refmatch_core::normalize::UNKNOWN_YEAR;
use refmatch_core::{FieldValue, ReferenceRecord, normalize_authors, normalize_year};
use serde::Serialize;

const TOP_N: usize = 10;
const JOURNAL_TAGS: &[&str] = &["JO", "T2", "JF"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub total: usize,
    /// Ascending by year, `unknown` last.
    pub years: Vec<Count>,
    pub top_authors: Vec<Count>,
    pub top_journals: Vec<Count>,
}

pub fn analyze(records: &[ReferenceRecord]) -> Analysis {
    let mut years: HashMap<String, usize> = HashMap::new();
    let mut authors: HashMap<String, usize> = HashMap::new();
    let mut journals: HashMap<String, usize> = HashMap::new();

    for record in records {
        *years.entry(normalize_year(record.year.as_ref())).or_default() += 1;
        for author in normalize_authors(record.authors.as_ref()) {
            *authors.entry(author).or_default() += 1;
        }
        if let Some(journal) = journal_of(record) {
            *journals.entry(journal).or_default() += 1;
        }
    }

    let mut years: Vec<Count> = years
        .into_iter()
        .map(|(name, count)| Count { name, count })
        .collect();
    years.sort_by(|a, b| {
        (a.name == UNKNOWN_YEAR, &a.name).cmp(&(b.name == UNKNOWN_YEAR, &b.name))
    });

    Analysis {
        total: records.len(),
        years,
        top_authors: top_counts(authors),
        top_journals: top_counts(journals),
    }
}

fn journal_of(record: &ReferenceRecord) -> Option<String> {
    JOURNAL_TAGS.iter().find_map(|tag| {
        record
            .raw
            .get(*tag)
            .and_then(FieldValue::first_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    })
}

fn top_counts(counts: HashMap<String, usize>) -> Vec<Count> {
    let mut counts: Vec<Count> = counts
        .into_iter()
        .map(|(name, count)| Count { name, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts.truncate(TOP_N);
    counts
}
