use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Kosmos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Convergence detection configuration
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Feedback loop configuration
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files (if None, logs only go to the console)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log to the console (stderr) as well when file logging is on
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_console: true,
            rotation: default_rotation(),
        }
    }
}

/// Convergence detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    /// Mandatory criteria, evaluated first and in order
    #[serde(default = "default_mandatory_criteria")]
    pub mandatory_criteria: Vec<String>,

    /// Optional criteria, evaluated after all mandatory ones, in order
    #[serde(default = "default_optional_criteria")]
    pub optional_criteria: Vec<String>,

    /// Novelty below this value counts as exhausted
    #[serde(default = "default_novelty_decline_threshold")]
    pub novelty_decline_threshold: f64,

    /// Number of trailing novelty observations inspected
    #[serde(default = "default_novelty_decline_window")]
    pub novelty_decline_window: usize,

    /// Cost per discovery (in dollars) above which returns are diminishing
    #[serde(default = "default_cost_per_discovery_threshold")]
    pub cost_per_discovery_threshold: f64,

    /// Maximum novelty observations retained
    #[serde(default = "default_novelty_history_limit")]
    pub novelty_history_limit: usize,
}

fn default_mandatory_criteria() -> Vec<String> {
    vec![
        "iteration_limit".to_string(),
        "no_testable_hypotheses".to_string(),
    ]
}

fn default_optional_criteria() -> Vec<String> {
    vec![
        "novelty_decline".to_string(),
        "diminishing_returns".to_string(),
    ]
}

const fn default_novelty_decline_threshold() -> f64 {
    0.3
}

const fn default_novelty_decline_window() -> usize {
    5
}

const fn default_cost_per_discovery_threshold() -> f64 {
    1000.0
}

const fn default_novelty_history_limit() -> usize {
    100
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            mandatory_criteria: default_mandatory_criteria(),
            optional_criteria: default_optional_criteria(),
            novelty_decline_threshold: default_novelty_decline_threshold(),
            novelty_decline_window: default_novelty_decline_window(),
            cost_per_discovery_threshold: default_cost_per_discovery_threshold(),
            novelty_history_limit: default_novelty_history_limit(),
        }
    }
}

/// Feedback loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedbackConfig {
    /// Confidence increase applied for a supporting result
    #[serde(default = "default_success_learning_rate")]
    pub success_learning_rate: f64,

    /// Confidence decrease applied for a refuting result
    #[serde(default = "default_failure_learning_rate")]
    pub failure_learning_rate: f64,

    /// Confidence gained by a success pattern on each merge
    #[serde(default = "default_pattern_confidence_step")]
    pub pattern_confidence_step: f64,
}

const fn default_success_learning_rate() -> f64 {
    0.3
}

const fn default_failure_learning_rate() -> f64 {
    0.4
}

const fn default_pattern_confidence_step() -> f64 {
    0.1
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            success_learning_rate: default_success_learning_rate(),
            failure_learning_rate: default_failure_learning_rate(),
            pattern_confidence_step: default_pattern_confidence_step(),
        }
    }
}

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Total memory budget, split evenly across categories
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,

    /// Memories younger than this are never pruned
    #[serde(default = "default_prune_after_days")]
    pub prune_after_days: i64,

    /// Memories at or above this importance are never pruned
    #[serde(default = "default_min_importance_to_keep")]
    pub min_importance_to_keep: f64,
}

const fn default_max_memories() -> usize {
    1000
}

const fn default_prune_after_days() -> i64 {
    30
}

const fn default_min_importance_to_keep() -> f64 {
    0.3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: default_max_memories(),
            prune_after_days: default_prune_after_days(),
            min_importance_to_keep: default_min_importance_to_keep(),
        }
    }
}
