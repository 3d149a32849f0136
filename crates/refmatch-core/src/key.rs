use std::fmt;

use serde::{Serialize, Serializer};

use crate::normalize::NormalizedFields;
use crate::record::ReferenceRecord;

/// Deterministic fingerprint of one record.
///
/// `Unkeyed` is produced for records with neither identifier nor title.
/// It never matches anything, including another `Unkeyed` key; grouping
/// gives each such record an identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKey {
    Identifier(String),
    TitleYear { title: String, year: String },
    Unkeyed,
}

impl MatchKey {
    pub fn is_matchable(&self) -> bool {
        !matches!(self, Self::Unkeyed)
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Identifier(_))
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "ID:{id}"),
            Self::TitleYear { title, year } => write!(f, "TY:{title}_{year}"),
            Self::Unkeyed => f.write_str("NK"),
        }
    }
}

impl Serialize for MatchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifier first, then normalized title + year.
pub fn generate_key(record: &ReferenceRecord) -> MatchKey {
    key_for(&NormalizedFields::from_record(record))
}

pub fn key_for(fields: &NormalizedFields) -> MatchKey {
    if fields.has_identifier() {
        return MatchKey::Identifier(fields.identifier.clone());
    }

    if !fields.title.is_empty() {
        return MatchKey::TitleYear {
            title: fields.title.clone(),
            year: fields.year.clone(),
        };
    }

    MatchKey::Unkeyed
}
