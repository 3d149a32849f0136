use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::similarity::{DEFAULT_FUZZY_THRESHOLD, SimilarityResolver, TitleMetric};

/// Matching knobs. Loaded from the `[matching]` table by the CLI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub fuzzy: FuzzyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub metric: TitleMetric,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_FUZZY_THRESHOLD,
            metric: TitleMetric::default(),
        }
    }
}

impl MatchConfig {
    pub fn exact_only() -> Self {
        Self {
            fuzzy: FuzzyConfig {
                enabled: false,
                ..FuzzyConfig::default()
            },
        }
    }

    pub fn with_fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.fuzzy.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MatchError::Config(format!(
                "fuzzy.threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(())
    }

    /// Resolver for the fuzzy pass, or `None` when it is disabled.
    pub fn resolver(&self) -> Option<SimilarityResolver> {
        self.fuzzy
            .enabled
            .then(|| SimilarityResolver::new(self.fuzzy.threshold, self.fuzzy.metric))
    }
}
