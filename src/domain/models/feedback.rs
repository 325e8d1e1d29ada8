//! Feedback signals and learned experiment patterns.
//!
//! A signal is created by result analysis, sits in the feedback loop's
//! pending queue, and is consumed once by `apply_feedback`, after which it is
//! relocated to the applied queue. Signals are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of a feedback signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    SuccessPattern,
    FailurePattern,
    HypothesisUpdate,
    StrategyAdjustment,
    TemplateUpdate,
    PriorityChange,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuccessPattern => "success_pattern",
            Self::FailurePattern => "failure_pattern",
            Self::HypothesisUpdate => "hypothesis_update",
            Self::StrategyAdjustment => "strategy_adjustment",
            Self::TemplateUpdate => "template_update",
            Self::PriorityChange => "priority_change",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directive carried by a pattern signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternAction {
    /// Raise the priority of hypotheses resembling a success pattern.
    IncreasePriority,
    /// Steer away from designs resembling a failure pattern.
    AvoidPattern,
}

/// Directive carried by a hypothesis-update signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAction {
    IncreaseConfidence,
    DecreaseConfidence,
    NoChange,
}

/// Statistics of the result that produced a hypothesis update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub supports: Option<bool>,
    pub p_value: Option<f64>,
    pub effect_size: Option<f64>,
}

/// Typed signal body. The variant determines the signal kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal_type", rename_all = "snake_case")]
pub enum SignalPayload {
    SuccessPattern {
        pattern_id: String,
        pattern: SuccessPattern,
        action: PatternAction,
        target: String,
    },
    FailurePattern {
        pattern_id: String,
        pattern: FailurePattern,
        action: PatternAction,
        recommended_fixes: Vec<String>,
    },
    HypothesisUpdate {
        hypothesis_id: String,
        action: ConfidenceAction,
        update_value: f64,
        result_summary: ResultSummary,
    },
    StrategyAdjustment {
        strategy: String,
        delta: f64,
    },
    TemplateUpdate {
        template: String,
        #[serde(default)]
        changes: HashMap<String, serde_json::Value>,
    },
    PriorityChange {
        hypothesis_id: String,
        priority: f64,
    },
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::SuccessPattern { .. } => SignalKind::SuccessPattern,
            Self::FailurePattern { .. } => SignalKind::FailurePattern,
            Self::HypothesisUpdate { .. } => SignalKind::HypothesisUpdate,
            Self::StrategyAdjustment { .. } => SignalKind::StrategyAdjustment,
            Self::TemplateUpdate { .. } => SignalKind::TemplateUpdate,
            Self::PriorityChange { .. } => SignalKind::PriorityChange,
        }
    }
}

/// A unit of learned feedback awaiting (or having received) application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSignal {
    pub id: Uuid,
    /// Result id (or analysis id) that produced the signal.
    pub source: String,
    pub payload: SignalPayload,
    pub confidence: f64,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

impl FeedbackSignal {
    pub fn new(source: impl Into<String>, payload: SignalPayload, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            payload,
            confidence: confidence.clamp(0.0, 1.0),
            applied: false,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }
}

/// Hypothesis traits recorded with a success pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisCharacteristics {
    pub domain: String,
    pub testability_score: Option<f64>,
    pub novelty_score: Option<f64>,
}

/// Experiment design recorded with a success pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    pub test_type: String,
    pub sample_size: Option<u64>,
}

/// Statistical outcome recorded with a success pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalApproach {
    pub p_value: Option<f64>,
    pub effect_size: Option<f64>,
    pub effect_size_type: String,
}

/// Conditions under which experiments of one test type have succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPattern {
    pub pattern_id: String,
    pub description: String,
    pub hypothesis_characteristics: HypothesisCharacteristics,
    pub experiment_design: ExperimentDesign,
    pub statistical_approach: StatisticalApproach,
    pub occurrences: u32,
    /// Running mean of outcomes merged into this pattern.
    pub success_rate: f64,
    pub confidence: f64,
    /// Result ids merged into this pattern, oldest first.
    pub examples: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SuccessPattern {
    /// Fold another successful result into this pattern.
    pub fn merge(&mut self, result_id: impl Into<String>, confidence_step: f64) {
        self.occurrences += 1;
        self.examples.push(result_id.into());
        let n = f64::from(self.occurrences);
        self.success_rate = (self.success_rate * (n - 1.0) + 1.0) / n;
        self.confidence = (self.confidence + confidence_step).min(1.0);
        self.updated_at = Utc::now();
    }
}

/// Why an experiment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The experiment did not execute.
    ExecutionError,
    /// Not significant and the effect is small.
    Underpowered,
    /// Not significant despite a sizeable effect.
    Statistical,
    /// The hypothesis itself is likely flawed.
    Conceptual,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecutionError => "execution_error",
            Self::Underpowered => "underpowered",
            Self::Statistical => "statistical",
            Self::Conceptual => "conceptual",
        }
    }

    /// Fixed remediation list for the category.
    pub fn recommended_fixes(&self) -> Vec<String> {
        let fixes: &[&str] = match self {
            Self::Underpowered => &[
                "Increase sample size",
                "Use more sensitive statistical test",
                "Reduce measurement error",
            ],
            Self::Statistical => &[
                "Check for outliers",
                "Verify assumptions",
                "Consider non-parametric test",
            ],
            Self::Conceptual => &[
                "Refine hypothesis",
                "Add moderating variables",
                "Explore boundary conditions",
            ],
            Self::ExecutionError => &["Review experimental design"],
        };
        fixes.iter().map(ToString::to_string).collect()
    }

    /// Human-readable label used in pattern descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExecutionError => "Execution error",
            Self::Underpowered => "Underpowered",
            Self::Statistical => "Statistical",
            Self::Conceptual => "Conceptual",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traits shared by failures of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureCharacteristics {
    pub domain: String,
    pub test_type: String,
}

/// Conditions under which experiments have failed, keyed by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
    pub pattern_id: String,
    pub description: String,
    pub failure_type: FailureCategory,
    pub common_characteristics: FailureCharacteristics,
    pub recommended_fixes: Vec<String>,
    pub occurrences: u32,
    pub examples: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FailurePattern {
    /// Fold another failed result into this pattern.
    pub fn merge(&mut self, result_id: impl Into<String>) {
        self.occurrences += 1;
        self.examples.push(result_id.into());
        self.updated_at = Utc::now();
    }
}

/// How pattern learning went for one result.
///
/// Pattern learning is best-effort: a skip is reported here rather than
/// raised, and the hypothesis update is emitted regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatternOutcome {
    SuccessLearned { pattern_id: String, merged: bool },
    FailureLearned {
        pattern_id: String,
        category: FailureCategory,
        merged: bool,
    },
    Skipped { reason: SkipReason },
    /// Inconclusive results carry no pattern.
    NotApplicable,
}

impl PatternOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Why a result's pattern was not extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The result names no primary test, so there is nothing to key on.
    MissingTestType,
    /// A reported statistic is NaN or infinite.
    NonFiniteStatistic { field: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTestType => f.write_str("result has no primary test type"),
            Self::NonFiniteStatistic { field } => write!(f, "non-finite {field}"),
        }
    }
}

/// Everything produced by processing one experiment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFeedback {
    pub signals: Vec<FeedbackSignal>,
    pub pattern: PatternOutcome,
}

/// A hypothesis confidence change made by `apply_feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceChange {
    pub hypothesis_id: String,
    pub previous: Option<f64>,
    pub updated: f64,
}

/// Structured diff of what applying one signal changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackChanges {
    pub hypotheses_updated: Vec<ConfidenceChange>,
    pub strategies_adjusted: Vec<String>,
    pub templates_modified: Vec<String>,
    pub priorities_changed: Vec<String>,
    /// Hypothesis ids named by the signal that were not found.
    pub unresolved_hypotheses: Vec<String>,
}

impl FeedbackChanges {
    pub fn is_empty(&self) -> bool {
        self.hypotheses_updated.is_empty()
            && self.strategies_adjusted.is_empty()
            && self.templates_modified.is_empty()
            && self.priorities_changed.is_empty()
    }
}

/// Snapshot of what the feedback loop has learned so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningSummary {
    pub success_patterns_learned: usize,
    pub failure_patterns_learned: usize,
    pub pending_signals: usize,
    pub applied_signals: usize,
    pub most_common_success: Option<String>,
    pub most_common_failure: Option<String>,
}
