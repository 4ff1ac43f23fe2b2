//! Configuration loading and parsing

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trial_log_decoder::{DesignProfile, KeyingMode, NumericPolicy, BUILTIN_PROFILES};

use crate::report::Column;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { root: default_root() }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("output")
}

/// Built-in profile selection plus optional field overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub name: Option<String>,
    pub keying: Option<KeyingMode>,
    pub timeout_sentinel: Option<f64>,
    /// 0 disables the row-count check
    pub expected_iterations: Option<usize>,
    pub hover_hit_limit: Option<u32>,
    pub numeric_policy: Option<NumericPolicy>,
}

impl ProfileConfig {
    /// Resolve to a design profile; `override_name` (from the command line) wins over `name`
    pub fn resolve(&self, override_name: Option<&str>) -> Result<DesignProfile> {
        let name = override_name
            .or(self.name.as_deref())
            .unwrap_or(BUILTIN_PROFILES[0]);

        let mut profile = DesignProfile::builtin(name).ok_or_else(|| {
            anyhow!(
                "Unknown profile {:?} (available: {})",
                name,
                BUILTIN_PROFILES.join(", ")
            )
        })?;

        if let Some(keying) = self.keying {
            profile = profile.with_keying(keying);
        }
        if let Some(seconds) = self.timeout_sentinel {
            profile = profile.with_timeout_sentinel(seconds);
        }
        if let Some(expected) = self.expected_iterations {
            profile = profile.with_expected_iterations((expected > 0).then_some(expected));
        }
        if let Some(limit) = self.hover_hit_limit {
            profile = profile.with_hover_hit_limit(limit);
        }
        if let Some(policy) = self.numeric_policy {
            profile = profile.with_numeric_policy(policy);
        }

        profile
            .validate()
            .with_context(|| format!("Invalid profile configuration for {:?}", name))?;
        Ok(profile)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "Column::default_set")]
    pub columns: Vec<Column>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    pub file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            columns: Column::default_set(),
            delimiter: default_delimiter(),
            file: None,
        }
    }
}

fn default_delimiter() -> String {
    ", ".to_string()
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.output.columns.is_empty() {
        return Err(anyhow!("Config file {:?} selects no output columns", path));
    }

    Ok(config)
}
