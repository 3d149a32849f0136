use refmatch_core::{Annotated, FieldValue, ReferenceRecord};

const DEFAULT_ENTRY_TYPE: &str = "GEN";
const PROVENANCE_PREFIX: &str = "refmatch";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Append engine metadata as `N1` notes.
    pub include_provenance: bool,
}

/// Render records as RIS, `TY` first and `ER` last.
///
/// Records that carry parsed fields are written back from them unchanged.
/// Records built in code fall back to their typed title, authors, year and
/// identifier.
pub fn write_ris<A: Annotated>(records: &[A], options: &ExportOptions) -> String {
    let mut lines = Vec::new();
    for item in records {
        let record = item.record();
        if record.raw.is_empty() {
            push_typed_fields(&mut lines, record);
        } else {
            push_raw_fields(&mut lines, record);
        }

        if options.include_provenance {
            for (name, value) in item.provenance() {
                push_line(&mut lines, "N1", &format!("{PROVENANCE_PREFIX}.{name}: {value}"));
            }
        }

        lines.push("ER  -".to_string());
        lines.push(String::new());
    }
    lines.join("\n")
}

fn push_raw_fields(lines: &mut Vec<String>, record: &ReferenceRecord) {
    let entry_type = record
        .raw
        .get("TY")
        .and_then(FieldValue::first_text)
        .unwrap_or_else(|| DEFAULT_ENTRY_TYPE.to_string());
    push_line(lines, "TY", &entry_type);

    for (tag, value) in &record.raw {
        if tag == "TY" || tag == "ER" {
            continue;
        }
        push_value(lines, tag, value);
    }
}

fn push_typed_fields(lines: &mut Vec<String>, record: &ReferenceRecord) {
    push_line(lines, "TY", DEFAULT_ENTRY_TYPE);
    if let Some(title) = record.title.as_deref() {
        push_line(lines, "TI", title);
    }
    if let Some(authors) = record.authors.as_ref() {
        push_value(lines, "AU", authors);
    }
    if let Some(year) = record.year.as_ref() {
        push_value(lines, "PY", year);
    }
    if let Some(identifier) = record.identifier.as_deref() {
        push_line(lines, "DO", identifier);
    }
}

fn push_value(lines: &mut Vec<String>, tag: &str, value: &FieldValue) {
    for text in value.texts() {
        push_line(lines, tag, &text);
    }
}

fn push_line(lines: &mut Vec<String>, tag: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    lines.push(format!("{tag}  - {value}"));
}
