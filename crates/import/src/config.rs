use ciclo_core::CycleStartDay;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::rules::{CategoryRule, CategoryRuleEngine, RuleError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Run parameters. Example:
///
/// ```toml
/// cycle_start_day = 28
/// holder_name = "Isabela Valonni"
///
/// [[rules]]
/// category = "Pets"
/// keywords = ["Petshop"]
/// is_fixed = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cycle_start_day: CycleStartDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    /// chrono format tried before the built-in date formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// Replaces the shipped rule set when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<CategoryRule>>,
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn rule_engine(&self) -> Result<CategoryRuleEngine, RuleError> {
        match &self.rules {
            Some(rules) => CategoryRuleEngine::new(rules.clone()),
            None => CategoryRuleEngine::with_default_rules(),
        }
    }
}
