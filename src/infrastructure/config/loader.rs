use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::MemoryCategory;
use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid novelty_decline_window: {0}. Must be at least 2")]
    InvalidNoveltyWindow(usize),

    #[error("Invalid {name}: {value}. Must be between 0.0 and 1.0")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("Invalid cost_per_discovery_threshold: {0}. Must be positive")]
    InvalidCostThreshold(f64),

    #[error("Invalid max_memories: {0}. Must be at least {1} (one per category)")]
    InvalidMaxMemories(usize, usize),

    #[error("Invalid prune_after_days: {0}. Cannot be negative")]
    InvalidPruneAfterDays(i64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .kosmos/config.yaml (project config)
    /// 3. .kosmos/local.yaml (project local overrides, optional)
    /// 4. Environment variables (KOSMOS_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".kosmos/config.yaml"))
            .merge(Yaml::file(".kosmos/local.yaml"))
            .merge(Env::prefixed("KOSMOS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Criterion names are not checked; unknown names are inert at runtime.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let convergence = &config.convergence;
        if convergence.novelty_decline_window < 2 {
            return Err(ConfigError::InvalidNoveltyWindow(
                convergence.novelty_decline_window,
            ));
        }
        check_unit(
            "novelty_decline_threshold",
            convergence.novelty_decline_threshold,
        )?;
        let cost_threshold = convergence.cost_per_discovery_threshold;
        if cost_threshold.is_nan() || cost_threshold <= 0.0 {
            return Err(ConfigError::InvalidCostThreshold(cost_threshold));
        }

        check_unit(
            "success_learning_rate",
            config.feedback.success_learning_rate,
        )?;
        check_unit(
            "failure_learning_rate",
            config.feedback.failure_learning_rate,
        )?;
        check_unit(
            "pattern_confidence_step",
            config.feedback.pattern_confidence_step,
        )?;

        let categories = MemoryCategory::ALL.len();
        if config.memory.max_memories < categories {
            return Err(ConfigError::InvalidMaxMemories(
                config.memory.max_memories,
                categories,
            ));
        }
        if config.memory.prune_after_days < 0 {
            return Err(ConfigError::InvalidPruneAfterDays(
                config.memory.prune_after_days,
            ));
        }
        check_unit(
            "min_importance_to_keep",
            config.memory.min_importance_to_keep,
        )?;

        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}
