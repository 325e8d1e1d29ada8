//! Stopping criteria and the decisions they produce.
//!
//! Criteria form a closed set. The detector evaluates them in the order the
//! caller listed them and reports the first one that fires, so two criteria
//! firing together always yield the same reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the research loop stopped (or did not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingReason {
    IterationLimit,
    NoTestableHypotheses,
    NoveltyDecline,
    DiminishingReturns,
    AllHypothesesTested,
    UserRequested,
    /// No criterion fired; research continues.
    NotConverged,
    /// A configured criterion name that is not recognized.
    UnknownCriterion,
}

impl StoppingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IterationLimit => "iteration_limit",
            Self::NoTestableHypotheses => "no_testable_hypotheses",
            Self::NoveltyDecline => "novelty_decline",
            Self::DiminishingReturns => "diminishing_returns",
            Self::AllHypothesesTested => "all_hypotheses_tested",
            Self::UserRequested => "user_requested",
            Self::NotConverged => "not_converged",
            Self::UnknownCriterion => "unknown_criterion",
        }
    }
}

impl std::fmt::Display for StoppingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stopping criterion the detector knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    /// `iteration_count >= max_iterations`.
    IterationLimit,
    /// No untested hypotheses and an empty experiment queue.
    NoTestableHypotheses,
    /// Trailing novelty observations all low or monotonically falling.
    NoveltyDecline,
    /// Cost per discovery above threshold.
    DiminishingReturns,
}

impl CriterionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IterationLimit => "iteration_limit",
            Self::NoTestableHypotheses => "no_testable_hypotheses",
            Self::NoveltyDecline => "novelty_decline",
            Self::DiminishingReturns => "diminishing_returns",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "iteration_limit" => Some(Self::IterationLimit),
            "no_testable_hypotheses" => Some(Self::NoTestableHypotheses),
            "novelty_decline" => Some(Self::NoveltyDecline),
            "diminishing_returns" => Some(Self::DiminishingReturns),
            _ => None,
        }
    }

    /// The reason reported when this criterion is evaluated.
    pub fn reason(&self) -> StoppingReason {
        match self {
            Self::IterationLimit => StoppingReason::IterationLimit,
            Self::NoTestableHypotheses => StoppingReason::NoTestableHypotheses,
            Self::NoveltyDecline => StoppingReason::NoveltyDecline,
            Self::DiminishingReturns => StoppingReason::DiminishingReturns,
        }
    }

    /// Hard limits are mandatory; the heuristics are advisory wherever they
    /// are listed.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::IterationLimit | Self::NoTestableHypotheses)
    }
}

impl std::fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a detector's ordered criterion list.
///
/// Names that fail to parse are kept in place so the list order stays the
/// one the caller configured; they evaluate to a non-stopping decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriterionSlot {
    Known(CriterionKind),
    Unrecognized(String),
}

impl CriterionSlot {
    pub fn parse(name: &str) -> Self {
        CriterionKind::from_str(name)
            .map_or_else(|| Self::Unrecognized(name.to_string()), Self::Known)
    }
}

impl From<CriterionKind> for CriterionSlot {
    fn from(kind: CriterionKind) -> Self {
        Self::Known(kind)
    }
}

/// Verdict of one convergence check. Produced fresh, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppingDecision {
    pub should_stop: bool,
    pub reason: StoppingReason,
    /// True if produced by a mandatory criterion.
    pub is_mandatory: bool,
    /// Confidence in the decision, in `[0, 1]`.
    pub confidence: f64,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl StoppingDecision {
    pub fn new(
        should_stop: bool,
        reason: StoppingReason,
        is_mandatory: bool,
        confidence: f64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            should_stop,
            reason,
            is_mandatory,
            confidence: confidence.clamp(0.0, 1.0),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    /// The decision returned when no criterion fires.
    pub fn continue_research() -> Self {
        Self::new(
            false,
            StoppingReason::NotConverged,
            false,
            1.0,
            "No stopping criteria met, research continues",
        )
    }
}
