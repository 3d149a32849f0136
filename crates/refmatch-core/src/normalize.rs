//! Canonical forms of the fields that matching reads.
//!
//! Every function here is total: missing or malformed input degrades to a
//! sentinel (`""`, [`UNKNOWN_YEAR`], [`ABSENT_IDENTIFIER`], empty list).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::record::{FieldValue, ReferenceRecord};

pub const UNKNOWN_YEAR: &str = "unknown";
pub const ABSENT_IDENTIFIER: &str = "absent";

const COMPACT_DATE_LEN: usize = 8;
const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];

static DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("valid digit run regex"));

/// Lowercase, drop one leading article, keep only letters and digits.
pub fn normalize_title(title: Option<&str>) -> String {
    let Some(title) = title else {
        return String::new();
    };

    let lowercase = title.to_lowercase();
    let mut body = lowercase.trim_start();
    for article in LEADING_ARTICLES {
        if let Some(rest) = body.strip_prefix(article)
            && rest.starts_with(char::is_whitespace)
        {
            body = rest;
            break;
        }
    }

    body.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// First run of exactly four digits, or [`UNKNOWN_YEAR`].
///
/// Without such a run, a compact `YYYYMMDD` date yields its first four
/// digits.
pub fn normalize_year(year: Option<&FieldValue>) -> String {
    let Some(text) = year.and_then(FieldValue::first_text) else {
        return UNKNOWN_YEAR.to_string();
    };

    let runs: Vec<&str> = DIGIT_RUN_RE.find_iter(&text).map(|run| run.as_str()).collect();
    runs.iter()
        .find(|run| run.len() == 4)
        .map(|run| run.to_string())
        .or_else(|| {
            runs.iter()
                .find(|run| run.len() == COMPACT_DATE_LEN)
                .map(|run| run[..4].to_string())
        })
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

pub fn normalize_identifier(identifier: Option<&str>) -> String {
    let trimmed = identifier.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return ABSENT_IDENTIFIER.to_string();
    }
    trimmed.to_lowercase()
}

/// Coerce any author representation into an ordered list of names.
///
/// Numeric values are not names and yield an empty list.
pub fn normalize_authors(authors: Option<&FieldValue>) -> Vec<String> {
    let values = match authors {
        Some(FieldValue::Text(text)) => vec![text.as_str()],
        Some(FieldValue::List(values)) => values.iter().map(String::as_str).collect(),
        Some(FieldValue::Integer(_) | FieldValue::Float(_)) | None => Vec::new(),
    };

    values
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// All canonical forms of one record, computed once per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFields {
    pub title: String,
    pub year: String,
    pub identifier: String,
    pub authors: Vec<String>,
}

impl NormalizedFields {
    pub fn from_record(record: &ReferenceRecord) -> Self {
        Self {
            title: normalize_title(record.title.as_deref()),
            year: normalize_year(record.year.as_ref()),
            identifier: normalize_identifier(record.identifier.as_deref()),
            authors: normalize_authors(record.authors.as_ref()),
        }
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier != ABSENT_IDENTIFIER
    }

    pub fn has_known_year(&self) -> bool {
        self.year != UNKNOWN_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_single_leading_article() {
        assert_eq!(normalize_title(Some("The Impact of AI")), "impactofai");
        assert_eq!(normalize_title(Some("A Study in Scarlet")), "studyinscarlet");
        assert_eq!(normalize_title(Some("An Overview")), "overview");
        assert_eq!(normalize_title(Some("The A Team")), "ateam");
    }

    #[test]
    fn title_keeps_article_like_prefixes_inside_words() {
        assert_eq!(normalize_title(Some("Theory of Mind")), "theoryofmind");
        assert_eq!(normalize_title(Some("Analysis")), "analysis");
        assert_eq!(normalize_title(Some("The")), "the");
    }

    #[test]
    fn title_removes_punctuation_and_spacing() {
        assert_eq!(
            normalize_title(Some("  Deep-Learning: A Survey!  ")),
            "deeplearningasurvey"
        );
        assert_eq!(normalize_title(Some("Études Françaises")), "étudesfrançaises");
    }

    #[test]
    fn missing_title_normalizes_to_empty() {
        assert_eq!(normalize_title(None), "");
        assert_eq!(normalize_title(Some("  ?!  ")), "");
    }

    #[test]
    fn year_takes_first_four_digit_run() {
        assert_eq!(normalize_year(Some(&FieldValue::from("2023/05/10"))), "2023");
        assert_eq!(normalize_year(Some(&FieldValue::from("2025///"))), "2025");
        assert_eq!(normalize_year(Some(&FieldValue::from("May 12, 1998"))), "1998");
        assert_eq!(normalize_year(Some(&FieldValue::Integer(2019))), "2019");
        assert_eq!(normalize_year(Some(&FieldValue::Float(2019.0))), "2019");
    }

    #[test]
    fn year_ignores_runs_of_other_lengths() {
        assert_eq!(normalize_year(Some(&FieldValue::from("05/10/2023"))), "2023");
        assert_eq!(normalize_year(Some(&FieldValue::from("in press"))), UNKNOWN_YEAR);
        assert_eq!(normalize_year(Some(&FieldValue::from("202305"))), UNKNOWN_YEAR);
        assert_eq!(normalize_year(None), UNKNOWN_YEAR);
    }

    #[test]
    fn year_reads_compact_dates() {
        assert_eq!(normalize_year(Some(&FieldValue::from("20230510"))), "2023");
        assert_eq!(normalize_year(Some(&FieldValue::Integer(20230510))), "2023");
        assert_eq!(normalize_year(Some(&FieldValue::from("20230510 / 1999"))), "1999");
    }

    #[test]
    fn identifier_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_identifier(Some("  10.1234/ML2023 ")),
            "10.1234/ml2023"
        );
        assert_eq!(normalize_identifier(Some("   ")), ABSENT_IDENTIFIER);
        assert_eq!(normalize_identifier(None), ABSENT_IDENTIFIER);
    }

    #[test]
    fn authors_accept_every_shape() {
        assert_eq!(
            normalize_authors(Some(&FieldValue::from("Smith, J."))),
            vec!["Smith, J."]
        );
        assert_eq!(
            normalize_authors(Some(&FieldValue::List(vec![
                "Smith, J.".to_string(),
                " ".to_string(),
                "Doe, A.".to_string(),
            ]))),
            vec!["Smith, J.", "Doe, A."]
        );
        assert!(normalize_authors(Some(&FieldValue::Integer(3))).is_empty());
        assert!(normalize_authors(None).is_empty());
    }
}
