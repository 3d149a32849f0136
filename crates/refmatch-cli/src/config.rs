use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use refmatch_core::{MatchConfig, ReportOrder};
use serde::{Deserialize, Serialize};

/// Root configuration, loaded from `~/.config/refmatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub matching: MatchConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json: bool,
    pub include_provenance: bool,
    /// Default order of dedup reports; `--sort` overrides it.
    pub order: ReportOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// `$REFMATCH_CONFIG`, else `<config_dir>/refmatch/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("REFMATCH_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("refmatch")
            .join("config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Missing files yield defaults. Present files must parse and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.matching.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use refmatch_core::TitleMetric;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert!(cfg.matching.fuzzy.enabled);
        assert_eq!(cfg.logging.level, "warn");
        assert!(!cfg.output.json);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.matching.fuzzy.threshold = 0.8;
        cfg.output.include_provenance = true;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.matching, cfg.matching);
        assert!(loaded.output.include_provenance);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching.fuzzy]\nmetric = \"levenshtein\"\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.matching.fuzzy.metric, TitleMetric::Levenshtein);
        assert_eq!(loaded.matching.fuzzy.threshold, 0.90);
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[matching.fuzzy]\nthreshold = 2.0\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.logging.level, "warn");
    }
}
