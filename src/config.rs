use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file structure for LogTriage.
///
/// Allows users to save common analysis settings and reuse them across runs.
/// Configuration files are loaded from the current directory or specified path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Pattern catalog sources
    #[serde(default)]
    pub patterns: PatternsConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternsConfig {
    /// Path to the local failure-signature file
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// URL of a community failure-signature file, merged after local rules
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patterns: PatternsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
            remote_url: None,
        }
    }
}

fn default_local_path() -> String {
    "patterns.json".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./logtriage.toml
    /// 3. ./logtriage.json
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["logtriage.toml", "logtriage.json"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}
