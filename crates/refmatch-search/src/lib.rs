//! Boolean search over reference records.
//!
//! ```text
//! LLM                          → whole-word term, case-insensitive
//! "risk of bias"               → phrase
//! assess*   *model             → `*` stands for any run of word characters
//! LLM OR GPT                   → either side
//! LLM AND risk                 → both sides (binds tighter than OR)
//! ("LLM*" OR GPT*) AND risk    → grouping
//! ```
//!
//! Queries run against a chosen set of [`SearchField`]s. Every hit records
//! which strings matched in which field, and the title and abstract come
//! back with `<mark>`-wrapped highlights.

pub mod engine;
pub mod error;
pub mod query;

pub use engine::{
    CompiledQuery, FieldMatches, SearchField, SearchHit, SearchMiss, SearchOutcome, SearchStats,
    highlight_text, search_records,
};
pub use error::{QuerySyntaxError, Result, SearchError};
pub use query::{Query, parse_query};
