//! Common test utilities for integration tests
//!
//! Provides shared fixtures used across multiple integration test files.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use kosmos::{ExperimentResult, Hypothesis, ResearchPlan, ResultStatus};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Hypotheses with the given novelty scores, created one minute apart.
pub fn hypotheses_with_novelty(scores: &[f64]) -> Vec<Hypothesis> {
    let start = Utc::now() - Duration::hours(1);
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            Hypothesis::new(
                format!("h{}", i + 1),
                format!("Hypothesis number {} about enzyme kinetics", i + 1),
                "biology",
            )
            .with_novelty(*score)
            .with_created_at(start + Duration::minutes(i as i64))
        })
        .collect()
}

/// A plan whose pool holds every hypothesis id.
pub fn plan_for(hypotheses: &[Hypothesis], max_iterations: u32) -> ResearchPlan {
    let mut plan = ResearchPlan::new("Does temperature affect enzyme activity?", max_iterations);
    for h in hypotheses {
        plan.add_hypothesis(h.id.clone());
    }
    plan
}

/// A completed, supporting result with a significant t-test.
pub fn supported(id: &str, hypothesis_id: &str) -> ExperimentResult {
    ExperimentResult::new(id, hypothesis_id, ResultStatus::Success, Some(true))
        .with_test("t_test", Some(0.01), Some(0.8))
        .with_sample_size(120)
}

/// A completed, refuting result.
pub fn refuted(id: &str, hypothesis_id: &str, p: f64, effect: f64) -> ExperimentResult {
    ExperimentResult::new(id, hypothesis_id, ResultStatus::Success, Some(false))
        .with_test("t_test", Some(p), Some(effect))
}

/// A completed result that neither supports nor refutes.
pub fn inconclusive(id: &str, hypothesis_id: &str) -> ExperimentResult {
    ExperimentResult::new(id, hypothesis_id, ResultStatus::Partial, None)
}
