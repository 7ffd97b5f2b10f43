// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for helmstat
//!
//! Stores defaults that command-line flags override.
//! All helmstat data is stored under ~/.helmstat/:
//! - ~/.helmstat/config.json - user configuration
//! - ~/.helmstat/log/ - rotated log files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Args, OutputFormat};
use crate::status::AggregateOptions;

/// Get the base helmstat directory (~/.helmstat/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".helmstat"))
        .context("Could not determine home directory")
}

/// helmstat configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Namespace used when neither -n nor -A is given
    #[serde(default)]
    pub namespace: Option<String>,

    /// Kubeconfig context used when -c is not given
    #[serde(default)]
    pub context: Option<String>,

    /// Overall deadline in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum number of resources inspected at once
    #[serde(default)]
    pub concurrency: Option<u32>,

    #[serde(default)]
    pub output: Option<OutputFormat>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.helmstat/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// Fold command-line flags over the stored defaults (flags win)
    pub fn merge_args(mut self, args: &Args) -> Self {
        if args.namespace.is_some() {
            self.namespace = args.namespace.clone();
        }
        if args.context.is_some() {
            self.context = args.context.clone();
        }
        if args.timeout.is_some() {
            self.timeout_secs = args.timeout;
        }
        if args.concurrency.is_some() {
            self.concurrency = args.concurrency;
        }
        if args.output.is_some() {
            self.output = args.output.clone();
        }
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output.clone().unwrap_or_default()
    }

    /// Aggregation options, with unset values taken from the defaults
    pub fn aggregate_options(&self, include_events: bool) -> AggregateOptions {
        let defaults = AggregateOptions::default();
        AggregateOptions {
            concurrency: self
                .concurrency
                .map(|c| c.max(1) as usize)
                .unwrap_or(defaults.concurrency),
            timeout: self
                .timeout_secs
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.timeout),
            include_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.namespace.is_none());
        assert_eq!(config.output_format(), OutputFormat::Table);
    }

    #[test]
    fn test_config_deserialize() {
        let json = r#"{"namespace": "prod", "timeout_secs": 10, "output": "json"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("prod"));
        assert_eq!(config.timeout_secs, Some(10));
        assert_eq!(config.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let config = Config {
            context: Some("staging".to_string()),
            concurrency: Some(4),
            ..Default::default()
        };
        config.save_to(&config_path).unwrap();

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_config_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            namespace: Some("prod".to_string()),
            timeout_secs: Some(60),
            output: Some(OutputFormat::Yaml),
            ..Default::default()
        };
        let args = Args::try_parse_from(["helmstat", "web", "-n", "dev", "-o", "json"]).unwrap();

        let merged = config.merge_args(&args);
        assert_eq!(merged.namespace.as_deref(), Some("dev"));
        assert_eq!(merged.timeout_secs, Some(60));
        assert_eq!(merged.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_aggregate_options() {
        let defaults = AggregateOptions::default();
        let options = Config::default().aggregate_options(true);
        assert_eq!(options.concurrency, defaults.concurrency);
        assert_eq!(options.timeout, defaults.timeout);
        assert!(options.include_events);

        let config = Config {
            timeout_secs: Some(5),
            concurrency: Some(2),
            ..Default::default()
        };
        let options = config.aggregate_options(false);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(!options.include_events);
    }

    #[test]
    fn test_aggregate_options_clamp_zero_values() {
        let config: Config =
            serde_json::from_str(r#"{"timeout_secs": 0, "concurrency": 0}"#).unwrap();
        let options = config.aggregate_options(true);
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert_eq!(options.concurrency, 1);
    }
}
