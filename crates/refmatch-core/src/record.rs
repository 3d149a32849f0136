use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

const TITLE_FIELDS: &[&str] = &["title", "ti", "t1", "primary_title"];
const AUTHOR_FIELDS: &[&str] = &["authors", "au", "a1"];
const YEAR_FIELDS: &[&str] = &["year", "py", "y1", "da"];
const IDENTIFIER_FIELDS: &[&str] = &["doi", "do"];

/// A single field value as handed over by a parser.
///
/// This is the closed set of shapes the normalizer accepts. Anything a
/// parser produces must be expressed as one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<String>),
}

impl FieldValue {
    /// First textual rendering of the value. Lists yield their first element.
    pub fn first_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::List(values) => values.first().cloned(),
        }
    }

    /// Every textual value, one per line of the original field.
    pub fn texts(&self) -> Vec<String> {
        match self {
            Self::List(values) => values.clone(),
            other => other.first_text().into_iter().collect(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(values) => f.write_str(&values.join("; ")),
            other => f.write_str(&other.first_text().unwrap_or_default()),
        }
    }
}

/// Original field set of a record, keyed by the parser's field names, in
/// the order the parser read them.
pub type RawFields = IndexMap<String, FieldValue>;

/// One bibliographic entry.
///
/// `raw` is kept exactly as the parser produced it so the record can be
/// re-exported. Everything the engine derives lives outside this struct.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub title: Option<String>,
    pub authors: Option<FieldValue>,
    pub year: Option<FieldValue>,
    pub identifier: Option<String>,
    pub source_label: String,
    pub raw: RawFields,
}

impl ReferenceRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Build a record from a parser's field map.
    ///
    /// Field names are matched case-insensitively against the common
    /// citation tags (`TI`/`T1`, `AU`/`A1`, `PY`/`Y1`/`DA`, `DO`) and their
    /// long forms. A map that carries none of them is rejected.
    pub fn from_fields(raw: RawFields, source_label: impl Into<String>) -> Result<Self> {
        let source_label = source_label.into();
        let record = Self {
            title: lookup(&raw, TITLE_FIELDS).and_then(FieldValue::first_text),
            authors: lookup(&raw, AUTHOR_FIELDS).cloned(),
            year: lookup(&raw, YEAR_FIELDS).cloned(),
            identifier: lookup(&raw, IDENTIFIER_FIELDS).and_then(FieldValue::first_text),
            source_label,
            raw,
        };

        if !record.exposes_any_field() {
            return Err(MatchError::InvalidInput(format!(
                "record from '{}' has none of title, authors, year or identifier (fields: {})",
                record.source_label,
                record.raw.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        Ok(record)
    }

    pub fn with_year(mut self, year: impl Into<FieldValue>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_authors(mut self, authors: impl Into<FieldValue>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    pub fn with_source(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    /// Whether the record carries at least one of the fields matching reads.
    pub fn exposes_any_field(&self) -> bool {
        self.title.is_some()
            || self.authors.is_some()
            || self.year.is_some()
            || self.identifier.is_some()
    }
}

/// Engine metadata attached to an output record.
///
/// Exporters call [`Annotated::record`] for the original fields and decide
/// separately whether to write [`Annotated::provenance`].
pub trait Annotated {
    fn record(&self) -> &ReferenceRecord;

    fn provenance(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

impl Annotated for ReferenceRecord {
    fn record(&self) -> &ReferenceRecord {
        self
    }
}

fn lookup<'a>(raw: &'a RawFields, names: &[&str]) -> Option<&'a FieldValue> {
    names.iter().find_map(|name| {
        raw.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
