//! Reference identity resolution and deduplication.
//!
//! Records are normalized, keyed by identifier or by title and year, and
//! merged into match groups. An optional fuzzy pass joins title-keyed groups
//! from the same year whose titles are near-identical. On top of the groups
//! sit the two user-facing operations, [`compare()`] and [`deduplicate()`].

pub mod compare;
pub mod confidence;
pub mod config;
pub mod dedup;
pub mod error;
pub mod grouping;
pub mod key;
pub mod matcher;
pub mod normalize;
pub mod record;
pub mod similarity;

pub use compare::{ComparisonResult, ComparisonStats, IdentityMatch, compare_records};
pub use confidence::{MatchDecision, MatchTier};
pub use config::{FuzzyConfig, MatchConfig};
pub use dedup::{
    DeduplicationResult, DeduplicationStats, RemovedDuplicate, ReportOrder, SourceStats,
    UniqueReference, deduplicate_sources,
};
pub use error::{MatchError, Result};
pub use grouping::{GroupMember, MatchGroup, resolve_groups};
pub use key::{MatchKey, generate_key};
pub use matcher::{ReferenceMatcher, compare, deduplicate};
pub use normalize::{
    NormalizedFields, normalize_authors, normalize_identifier, normalize_title, normalize_year,
};
pub use record::{Annotated, FieldValue, RawFields, ReferenceRecord};
pub use similarity::{SimilarityResolver, TitleMetric, sequence_ratio};
