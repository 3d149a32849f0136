use crate::compare::{ComparisonResult, compare_records};
use crate::config::MatchConfig;
use crate::dedup::{DeduplicationResult, deduplicate_sources};
use crate::error::Result;
use crate::grouping::{MatchGroup, resolve_groups};
use crate::record::ReferenceRecord;

/// Entry point bundling a validated [`MatchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceMatcher {
    config: MatchConfig,
}

impl ReferenceMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_fuzzy(mut self, enabled: bool) -> Self {
        self.config.fuzzy.enabled = enabled;
        self
    }

    /// Threshold is clamped into `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config.fuzzy.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn resolve(&self, records: &[ReferenceRecord]) -> Result<Vec<MatchGroup>> {
        resolve_groups(records, &self.config)
    }

    pub fn compare(
        &self,
        records_a: &[ReferenceRecord],
        records_b: &[ReferenceRecord],
    ) -> Result<ComparisonResult> {
        compare_records(records_a, records_b, &self.config)
    }

    pub fn deduplicate<L: AsRef<str>>(
        &self,
        sources: &[(L, Vec<ReferenceRecord>)],
    ) -> Result<DeduplicationResult> {
        deduplicate_sources(sources, &self.config)
    }
}

/// Compare two collections with the default threshold.
pub fn compare(
    records_a: &[ReferenceRecord],
    records_b: &[ReferenceRecord],
    use_fuzzy: bool,
) -> Result<ComparisonResult> {
    ReferenceMatcher::new()
        .with_fuzzy(use_fuzzy)
        .compare(records_a, records_b)
}

/// Deduplicate labelled sources with the default configuration.
pub fn deduplicate<L: AsRef<str>>(
    sources: &[(L, Vec<ReferenceRecord>)],
) -> Result<DeduplicationResult> {
    ReferenceMatcher::new().deduplicate(sources)
}
