use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use refmatch_core::{FieldValue, ReferenceRecord};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::query::{Query, parse_query};

const ABSTRACT_FIELDS: &[&str] = &["abstract", "ab", "n2"];
const KEYWORD_FIELDS: &[&str] = &["keywords", "kw"];
const JOURNAL_FIELDS: &[&str] = &["journal_name", "jo", "t2", "jf"];

/// Matched strings per field, as they appear in the record.
pub type FieldMatches = BTreeMap<SearchField, BTreeSet<String>>;

/// A part of a record a query can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Abstract,
    Keywords,
    Journal,
    Authors,
}

impl SearchField {
    pub const ALL: [SearchField; 5] = [
        SearchField::Title,
        SearchField::Abstract,
        SearchField::Keywords,
        SearchField::Journal,
        SearchField::Authors,
    ];

    pub const DEFAULT: [SearchField; 2] = [SearchField::Title, SearchField::Abstract];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
            Self::Keywords => "keywords",
            Self::Journal => "journal",
            Self::Authors => "authors",
        }
    }

    /// Every text the record holds for this field.
    pub fn texts(self, record: &ReferenceRecord) -> Vec<String> {
        match self {
            Self::Title => record.title.iter().cloned().collect(),
            Self::Authors => record.authors.as_ref().map(FieldValue::texts).unwrap_or_default(),
            Self::Abstract => raw_texts(record, ABSTRACT_FIELDS),
            Self::Keywords => raw_texts(record, KEYWORD_FIELDS),
            Self::Journal => raw_texts(record, JOURNAL_FIELDS),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!("unknown search field '{wanted}' (expected title, abstract, keywords, journal or authors)")
            })
    }
}

fn raw_texts(record: &ReferenceRecord, names: &[&str]) -> Vec<String> {
    record
        .raw
        .iter()
        .filter(|(key, _)| names.iter().any(|name| key.eq_ignore_ascii_case(name)))
        .flat_map(|(_, value)| value.texts())
        .collect()
}

/// Pattern for one term: `*` becomes a run of word characters, and the
/// term is anchored on word boundaries except where a wildcard stands.
fn term_pattern(text: &str) -> String {
    let mut pattern = regex::escape(text).replace(r"\*", r"\w*");
    if !text.starts_with('*') {
        pattern.insert_str(0, r"\b");
    }
    if !text.ends_with('*') {
        pattern.push_str(r"\b");
    }
    pattern
}

/// A query with every term compiled to its regex.
#[derive(Debug, Clone)]
pub enum CompiledQuery {
    Term(Regex),
    And(Box<CompiledQuery>, Box<CompiledQuery>),
    Or(Box<CompiledQuery>, Box<CompiledQuery>),
}

impl CompiledQuery {
    pub fn new(query: &Query) -> Result<Self> {
        Ok(match query {
            Query::Term { text, .. } => Self::Term(
                RegexBuilder::new(&term_pattern(text))
                    .case_insensitive(true)
                    .build()?,
            ),
            Query::And(left, right) => {
                Self::And(Box::new(Self::new(left)?), Box::new(Self::new(right)?))
            }
            Query::Or(left, right) => {
                Self::Or(Box::new(Self::new(left)?), Box::new(Self::new(right)?))
            }
        })
    }

    /// Evaluate against a record. `None` means no match; otherwise the
    /// strings every matching term found, per field.
    pub fn matches(&self, record: &ReferenceRecord, fields: &[SearchField]) -> Option<FieldMatches> {
        let texts: Vec<(SearchField, Vec<String>)> = fields
            .iter()
            .map(|field| (*field, field.texts(record)))
            .collect();
        self.evaluate(&texts)
    }

    fn evaluate(&self, texts: &[(SearchField, Vec<String>)]) -> Option<FieldMatches> {
        match self {
            Self::Term(regex) => {
                let mut found = FieldMatches::new();
                for (field, values) in texts {
                    let hits: BTreeSet<String> = values
                        .iter()
                        .flat_map(|value| regex.find_iter(value).map(|m| m.as_str().to_string()))
                        .collect();
                    if !hits.is_empty() {
                        found.entry(*field).or_default().extend(hits);
                    }
                }
                (!found.is_empty()).then_some(found)
            }
            Self::And(left, right) => match (left.evaluate(texts), right.evaluate(texts)) {
                (Some(left), Some(right)) => Some(merge(left, right)),
                _ => None,
            },
            // Both sides are evaluated so a hit reports every matching term.
            Self::Or(left, right) => match (left.evaluate(texts), right.evaluate(texts)) {
                (Some(left), Some(right)) => Some(merge(left, right)),
                (Some(found), None) | (None, Some(found)) => Some(found),
                (None, None) => None,
            },
        }
    }
}

fn merge(mut left: FieldMatches, right: FieldMatches) -> FieldMatches {
    for (field, strings) in right {
        left.entry(field).or_default().extend(strings);
    }
    left
}

/// Wrap occurrences of `terms` in `<mark>` tags.
///
/// Occurrences are found case-insensitively and keep the text's own case.
/// Where two overlap, the one that starts first wins, and at the same
/// start the shorter one, so as many occurrences as possible get marked.
pub fn highlight_text(text: &str, terms: &BTreeSet<String>) -> String {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for term in terms.iter().filter(|term| !term.is_empty()) {
        let Ok(regex) = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        spans.extend(regex.find_iter(text).map(|m| (m.start(), m.end())));
    }
    spans.sort_by_key(|(start, end)| (*start, end - start));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in spans {
        if start < last {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str("<mark>");
        out.push_str(&text[start..end]);
        out.push_str("</mark>");
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// A record the query matched.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Index of the record in the searched batch.
    pub position: usize,
    pub record: ReferenceRecord,
    pub field_matches: FieldMatches,
    /// Matched strings of every field, fields in [`SearchField`] order.
    pub matched_terms: Vec<String>,
    pub match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_abstract: Option<String>,
}

impl SearchHit {
    fn new(position: usize, record: &ReferenceRecord, field_matches: FieldMatches) -> Self {
        let matched_terms: Vec<String> = field_matches.values().flatten().cloned().collect();

        let highlighted_title = field_matches.get(&SearchField::Title).and_then(|terms| {
            record
                .title
                .as_deref()
                .filter(|title| !title.is_empty())
                .map(|title| highlight_text(title, terms))
        });
        let highlighted_abstract = field_matches.get(&SearchField::Abstract).and_then(|terms| {
            let text = SearchField::Abstract.texts(record).join(" ");
            (!text.is_empty()).then(|| highlight_text(&text, terms))
        });

        Self {
            position,
            record: record.clone(),
            match_count: matched_terms.len(),
            matched_terms,
            field_matches,
            highlighted_title,
            highlighted_abstract,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMiss {
    pub position: usize,
    pub record: ReferenceRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Share of matched records, rounded to two decimals.
    pub match_percentage: f64,
    pub query: String,
    pub fields: Vec<SearchField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub misses: Vec<SearchMiss>,
    pub stats: SearchStats,
}

/// Run `query` over `records`, looking only at `fields`.
///
/// The query is parsed even when there are no records, so a malformed
/// query is always reported. Repeated fields are searched once.
pub fn search_records(
    records: &[ReferenceRecord],
    query: &str,
    fields: &[SearchField],
) -> Result<SearchOutcome> {
    let mut selected: Vec<SearchField> = Vec::new();
    for field in fields {
        if !selected.contains(field) {
            selected.push(*field);
        }
    }
    if selected.is_empty() {
        return Err(SearchError::NoFields);
    }

    let parsed = parse_query(query)?;
    let compiled = CompiledQuery::new(&parsed)?;

    let mut hits = Vec::new();
    let mut misses = Vec::new();
    for (position, record) in records.iter().enumerate() {
        match compiled.matches(record, &selected) {
            Some(found) => hits.push(SearchHit::new(position, record, found)),
            None => misses.push(SearchMiss {
                position,
                record: record.clone(),
            }),
        }
    }

    let total = records.len();
    let match_percentage = if total == 0 {
        0.0
    } else {
        (hits.len() as f64 / total as f64 * 10_000.0).round() / 100.0
    };

    debug!(
        query = %parsed,
        total,
        matched = hits.len(),
        "search finished"
    );

    Ok(SearchOutcome {
        stats: SearchStats {
            total,
            matched: hits.len(),
            unmatched: misses.len(),
            match_percentage,
            query: query.to_string(),
            fields: selected,
        },
        hits,
        misses,
    })
}
