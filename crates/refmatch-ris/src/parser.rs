use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use refmatch_core::{FieldValue, RawFields, ReferenceRecord};
use tracing::{debug, warn};

use crate::error::{Result, RisError};

static TAG_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][A-Z0-9])  -(?: (.*))?$").expect("valid RIS tag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RisEntry {
    pub entry_type: String,
    /// Tags in the order they first appear in the entry.
    pub fields: IndexMap<String, Vec<String>>,
}

impl RisEntry {
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.fields
            .get(tag)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, tag: &str) -> &[String] {
        self.fields.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Tag map as record fields. Single values stay text, repeated tags
    /// become lists, and `TY` is included when present.
    pub fn raw_fields(&self) -> RawFields {
        let mut raw = RawFields::new();
        if !self.entry_type.is_empty() {
            raw.insert("TY".to_string(), FieldValue::from(self.entry_type.as_str()));
        }
        for (tag, values) in &self.fields {
            let value = match values.as_slice() {
                [single] => FieldValue::Text(single.clone()),
                many => FieldValue::List(many.to_vec()),
            };
            raw.insert(tag.clone(), value);
        }
        raw
    }

    pub fn into_record(self, source_label: &str) -> Result<ReferenceRecord> {
        let raw = self.raw_fields();
        Ok(ReferenceRecord::from_fields(raw, source_label)?)
    }
}

/// Split RIS text into entries.
///
/// Non-tag lines continue the previous tag's last value. Only a `TY` inside
/// an open entry is treated as malformed.
pub fn parse_ris(content: &str) -> Result<Vec<RisEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<RisEntry> = None;
    let mut last_tag: Option<String> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_start_matches('\u{feff}').trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let Some(caps) = TAG_LINE_RE.captures(line) else {
            let appended = match (current.as_mut(), last_tag.as_deref()) {
                (Some(entry), Some(tag)) => append_continuation(entry, tag, line.trim()),
                _ => false,
            };
            if !appended {
                warn!(line = line_no, "skipping RIS continuation line without a tag");
            }
            continue;
        };

        let tag = &caps[1];
        let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

        match tag {
            "TY" => {
                if current.is_some() {
                    return Err(RisError::Parse {
                        line: line_no,
                        message: "TY opens a new entry before ER closed the previous one"
                            .to_string(),
                    });
                }
                current = Some(RisEntry {
                    entry_type: value.to_string(),
                    fields: IndexMap::new(),
                });
                last_tag = Some(tag.to_string());
            }
            "ER" => {
                match current.take() {
                    Some(entry) => entries.push(entry),
                    None => warn!(line = line_no, "ignoring ER without an open entry"),
                }
                last_tag = None;
            }
            _ => {
                let entry = current.get_or_insert_with(RisEntry::default);
                entry
                    .fields
                    .entry(tag.to_string())
                    .or_default()
                    .push(value.to_string());
                last_tag = Some(tag.to_string());
            }
        }
    }

    if let Some(entry) = current.take() {
        entries.push(entry);
    }

    debug!(entries = entries.len(), "parsed RIS content");
    Ok(entries)
}

fn append_continuation(entry: &mut RisEntry, tag: &str, text: &str) -> bool {
    let target = if tag == "TY" {
        Some(&mut entry.entry_type)
    } else {
        entry.fields.get_mut(tag).and_then(|values| values.last_mut())
    };
    let Some(target) = target else {
        return false;
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
    true
}

pub fn parse_records(content: &str, source_label: &str) -> Result<Vec<ReferenceRecord>> {
    parse_ris(content)?
        .into_iter()
        .map(|entry| entry.into_record(source_label))
        .collect()
}

pub fn read_ris_file(path: impl AsRef<Path>, source_label: &str) -> Result<Vec<ReferenceRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let records = parse_records(&content, source_label)?;
    debug!(path = %path.display(), records = records.len(), "read RIS file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use refmatch_core::MatchError;

    use super::*;

    const SAMPLE: &str = "\
TY  - JOUR
TI  - Attention Is All
  You Need
AU  - Vaswani, Ashish
AU  - Shazeer, Noam
PY  - 2017
DO  - 10.48550/arXiv.1706.03762
ER  -

TY  - BOOK
TI  - Deep Learning
PY  - 2016///
ER  -
";

    #[test]
    fn parses_entries_with_continuations() {
        let entries = parse_ris(SAMPLE).unwrap();

        assert_eq!(entries.len(), 2);
        let first = &entries[0];
        assert_eq!(first.entry_type, "JOUR");
        assert_eq!(first.first("TI"), Some("Attention Is All You Need"));
        assert_eq!(first.all("AU"), ["Vaswani, Ashish", "Shazeer, Noam"]);
        assert_eq!(entries[1].first("PY"), Some("2016///"));
    }

    #[test]
    fn maps_tags_onto_record_fields() {
        let records = parse_records(SAMPLE, "sample.ris").unwrap();

        let first = &records[0];
        assert_eq!(first.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(first.identifier.as_deref(), Some("10.48550/arXiv.1706.03762"));
        assert_eq!(first.source_label, "sample.ris");
        assert_eq!(
            first.authors,
            Some(FieldValue::List(vec![
                "Vaswani, Ashish".to_string(),
                "Shazeer, Noam".to_string()
            ]))
        );
        assert_eq!(first.raw.get("TY"), Some(&FieldValue::from("JOUR")));
    }

    #[test]
    fn alternate_tags_are_recognised() {
        let content = "TY  - GEN\nT1  - Alternate Title\nA1  - Doe, J.\nY1  - 1999/01/01\nER  -\n";
        let records = parse_records(content, "alt.ris").unwrap();
        assert_eq!(records[0].title.as_deref(), Some("Alternate Title"));
        assert!(records[0].year.is_some());
        assert!(records[0].authors.is_some());
    }

    #[test]
    fn trailing_entry_without_er_is_kept() {
        let entries = parse_ris("TY  - JOUR\nTI  - Unterminated\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first("TI"), Some("Unterminated"));
    }

    #[test]
    fn stray_continuation_is_skipped() {
        let entries = parse_ris("just some text\nTY  - JOUR\nTI  - Real\nER  -\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first("TI"), Some("Real"));
    }

    #[test]
    fn nested_ty_is_a_parse_error() {
        let err = parse_ris("TY  - JOUR\nTI  - One\nTY  - JOUR\n").unwrap_err();
        assert!(matches!(err, RisError::Parse { line: 3, .. }));
    }

    #[test]
    fn entry_without_matching_fields_is_rejected() {
        let err = parse_records("TY  - JOUR\nN1  - only a note\nER  -\n", "x.ris").unwrap_err();
        assert!(matches!(err, RisError::Record(MatchError::InvalidInput(_))));
    }

    #[test]
    fn reads_records_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let records = read_ris_file(file.path(), "disk.ris").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source_label == "disk.ris"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_ris_file(dir.path().join("absent.ris"), "absent").unwrap_err();
        assert!(matches!(err, RisError::Io(_)));
    }
}
