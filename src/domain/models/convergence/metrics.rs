//! Running convergence metrics for a research session.
//!
//! Every field except `novelty_trend`, `start_time` and the externally
//! recorded cost is recomputed from scratch on each update: the detector
//! overwrites the aggregate, it never merges. `novelty_trend` is the one
//! piece of history, one point per update, and is what the novelty-decline
//! criterion windows over.
//!
//! # Invariants
//!
//! `discovery_rate`, `saturation_ratio` and `consistency_score` always lie in
//! `[0, 1]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate progress metrics, one instance per detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceMetrics {
    /// Supported results / total results.
    pub discovery_rate: f64,
    pub total_experiments: usize,
    /// Results with `supports_hypothesis == Some(true)`.
    pub significant_results: usize,

    /// Most recent non-null hypothesis novelty, in creation order.
    pub novelty_score: f64,
    /// One novelty observation per metric update, oldest first.
    pub novelty_trend: Vec<f64>,
    /// True when the last three hypothesis novelty values are non-increasing.
    pub novelty_declining: bool,

    /// Tested / total hypotheses, as reported by the plan.
    pub saturation_ratio: f64,
    pub hypotheses_tested: usize,
    pub total_hypotheses: usize,

    /// Supported / total results. A stand-in for replication rate, not a
    /// statistically rigorous replication measure.
    pub consistency_score: f64,

    pub iteration_count: u32,
    pub max_iterations: u32,

    pub total_cost: f64,
    /// `total_cost / significant_results`; `None` until something is significant.
    pub cost_per_discovery: Option<f64>,

    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Default for ConvergenceMetrics {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            discovery_rate: 0.0,
            total_experiments: 0,
            significant_results: 0,
            novelty_score: 0.0,
            novelty_trend: Vec::new(),
            novelty_declining: false,
            saturation_ratio: 0.0,
            hypotheses_tested: 0,
            total_hypotheses: 0,
            consistency_score: 0.0,
            iteration_count: 0,
            max_iterations: 10,
            total_cost: 0.0,
            cost_per_discovery: None,
            start_time: now,
            last_update: now,
        }
    }
}

impl ConvergenceMetrics {
    /// Append a novelty observation, dropping the oldest points beyond `limit`.
    pub fn push_novelty(&mut self, value: f64, limit: usize) {
        self.novelty_trend.push(value);
        if self.novelty_trend.len() > limit {
            let excess = self.novelty_trend.len() - limit;
            self.novelty_trend.drain(..excess);
        }
    }

    /// The trailing `window` trend points, or `None` if fewer are recorded.
    pub fn recent_novelty(&self, window: usize) -> Option<&[f64]> {
        if window == 0 || self.novelty_trend.len() < window {
            return None;
        }
        Some(&self.novelty_trend[self.novelty_trend.len() - window..])
    }

    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

/// True when every value is greater than or equal to its successor.
pub fn is_non_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] >= pair[1])
}
