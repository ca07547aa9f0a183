use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use txstore_batch::BatchConfig;
use txstore_import::{CategoryRuleEngine, CsvImportConfig, ExtractConfig};

/// Everything the binary reads from `--config`. Missing sections fall back
/// to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub batch: BatchConfig,
    pub csv: CsvImportConfig,
    pub extract: ExtractConfig,
    /// TOML file with extra `[[rules]]` layered over the built-in keywords.
    pub rules_file: Option<PathBuf>,
    /// Mirror database used when `--db` is not given.
    pub db_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("parsing config")?;
        config.batch.validate().context("invalid [batch] section")?;
        config.csv.validate().context("invalid [csv] section")?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("loading {}", path.display()))
    }

    pub fn rule_engine(&self) -> Result<CategoryRuleEngine> {
        let Some(path) = &self.rules_file else {
            return Ok(CategoryRuleEngine::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading rules {}", path.display()))?;
        CategoryRuleEngine::from_toml(&content).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txstore_core::{Category, Money, Source};

    #[test]
    fn missing_file_means_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.batch, BatchConfig::default());
        assert_eq!(config.csv.delimiter, ",");
        assert!(!config.extract.sample_fallback);
    }

    #[test]
    fn sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            db_path = "mirror.db"

            [batch]
            max_batch_size = 5
            allow_partial_import = false

            [csv]
            delimiter = ";"
            source = "manual"

            [extract]
            sample_fallback = true
            "#,
        )
        .unwrap();
        assert_eq!(config.batch.max_batch_size, 5);
        assert!(!config.batch.allow_partial_import);
        assert_eq!(config.csv.delimiter, ";");
        assert_eq!(config.csv.source, Source::Manual);
        assert!(config.extract.sample_fallback);
        assert_eq!(config.db_path, Some(PathBuf::from("mirror.db")));
    }

    #[test]
    fn invalid_batch_section_is_rejected() {
        let err = AppConfig::from_toml("[batch]\nmax_batch_size = 99\n").unwrap_err();
        assert!(format!("{err:#}").contains("max_batch_size"));
    }

    #[test]
    fn multi_character_delimiter_is_rejected() {
        let err = AppConfig::from_toml("[csv]\ndelimiter = \";;\"\n").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("invalid [csv] section"));
        assert!(message.contains("single ASCII character"));
    }

    #[test]
    fn rules_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.toml");
        std::fs::write(
            &rules,
            "[[rules]]\nname = \"gym\"\nkeywords = [\"gym\"]\ncategory = \"entertainment\"\npriority = 10\n",
        )
        .unwrap();

        let config = AppConfig { rules_file: Some(rules), ..AppConfig::default() };
        let engine = config.rule_engine().unwrap();
        assert_eq!(engine.categorize("CITY GYM", Money::from_cents(-3000)), Category::Entertainment);
        assert_eq!(engine.categorize("KROGER", Money::from_cents(-3000)), Category::Groceries);
    }
}
