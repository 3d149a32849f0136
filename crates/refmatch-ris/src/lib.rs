//! RIS collaborators for refmatch: read tagged citation files into
//! [`ReferenceRecord`](refmatch_core::ReferenceRecord)s and write result
//! sets back out.

pub mod error;
pub mod parser;
pub mod writer;

pub use error::{Result, RisError};
pub use parser::{RisEntry, parse_records, parse_ris, read_ris_file};
pub use writer::{ExportOptions, write_ris};
