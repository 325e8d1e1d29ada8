//! Sequential driver for one research iteration.
//!
//! Per experiment result:
//! 1. Deduplicate: check and record the experiment signature
//! 2. Learn: process feedback and apply the produced signals
//! 3. Remember: store a success or failure memory
//! 4. Decide: update the plan and check convergence
//!
//! The driver owns the session (plan, hypotheses, completed results); each
//! component keeps its own state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Config, ConvergenceReport, DuplicateCheck, ExperimentProtocol, ExperimentResult, Hypothesis,
    PatternOutcome, ResearchPlan, StoppingDecision, StoppingReason,
};
use crate::services::convergence_detector::ConvergenceDetector;
use crate::services::feedback_loop::{categorize_failure, FeedbackLoop};
use crate::services::memory_store::MemoryStore;

/// Mutable state of a research session, owned by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSession {
    pub plan: ResearchPlan,
    pub hypotheses: Vec<Hypothesis>,
    /// Results already processed, in execution order.
    pub results: Vec<ExperimentResult>,
    #[serde(default)]
    pub strategy_weights: HashMap<String, f64>,
    /// Set once a stopping decision has been made.
    #[serde(default)]
    pub stopping_reason: Option<StoppingReason>,
}

impl ResearchSession {
    /// Start a session; every hypothesis joins the plan's pool.
    pub fn new(mut plan: ResearchPlan, hypotheses: Vec<Hypothesis>) -> Self {
        for hypothesis in &hypotheses {
            plan.add_hypothesis(hypothesis.id.clone());
        }
        Self {
            plan,
            hypotheses,
            ..Default::default()
        }
    }

    pub fn hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.id == id)
    }

    pub fn has_converged(&self) -> bool {
        self.plan.has_converged
    }
}

/// What one iteration did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationOutcome {
    pub iteration: u32,
    pub result_id: String,
    pub hypothesis_id: String,
    /// Duplicate status before this run was recorded.
    pub duplicate: DuplicateCheck,
    /// `None` when the result named an unknown hypothesis.
    pub pattern: Option<PatternOutcome>,
    pub signals_applied: usize,
    pub memory_id: Option<String>,
    pub decision: StoppingDecision,
}

/// Runs the control plane components in order for each result.
pub struct ResearchIteration {
    convergence: ConvergenceDetector,
    feedback: FeedbackLoop,
    memory: MemoryStore,
}

impl ResearchIteration {
    pub fn new(convergence: ConvergenceDetector, feedback: FeedbackLoop, memory: MemoryStore) -> Self {
        Self {
            convergence,
            feedback,
            memory,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ConvergenceDetector::new(config.convergence.clone()),
            FeedbackLoop::new(config.feedback.clone()),
            MemoryStore::new(config.memory.clone()),
        )
    }

    pub fn convergence(&self) -> &ConvergenceDetector {
        &self.convergence
    }

    pub fn feedback(&self) -> &FeedbackLoop {
        &self.feedback
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Process one finished experiment and decide whether to continue.
    pub async fn run(
        &self,
        session: &mut ResearchSession,
        result: ExperimentResult,
        protocol: Option<&ExperimentProtocol>,
    ) -> DomainResult<IterationOutcome> {
        let hypothesis = session.hypothesis(&result.hypothesis_id).cloned();

        let mut duplicate = DuplicateCheck::Unique;
        let mut pattern = None;
        let mut signals_applied = 0;
        let mut memory_id = None;

        match &hypothesis {
            Some(hypothesis) => {
                duplicate = self
                    .memory
                    .is_duplicate_experiment(hypothesis, protocol)
                    .await;
                if duplicate.is_duplicate() {
                    tracing::warn!(
                        result_id = %result.id,
                        reason = ?duplicate.reason(),
                        "Experiment repeats earlier work"
                    );
                }
                self.memory.record_experiment(hypothesis, protocol).await;

                let feedback = self
                    .feedback
                    .process_result_feedback(&result, hypothesis)
                    .await;
                for signal in &feedback.signals {
                    self.feedback
                        .apply_feedback(
                            signal,
                            &mut session.hypotheses,
                            Some(&mut session.strategy_weights),
                        )
                        .await?;
                    signals_applied += 1;
                }

                memory_id = self.remember(&result, hypothesis, &feedback.pattern).await;
                pattern = Some(feedback.pattern);
            }
            None => {
                tracing::warn!(
                    result_id = %result.id,
                    hypothesis_id = %result.hypothesis_id,
                    "Result references unknown hypothesis, skipping feedback"
                );
            }
        }

        session
            .plan
            .mark_tested(&result.hypothesis_id, result.supports_hypothesis);
        session.plan.iteration_count += 1;

        let outcome_ids = (result.id.clone(), result.hypothesis_id.clone());
        session.results.push(result);

        let decision = self
            .convergence
            .check_convergence(&session.plan, &session.hypotheses, &session.results)
            .await;
        if decision.should_stop {
            session.plan.has_converged = true;
            session.stopping_reason = Some(decision.reason);
        }

        Ok(IterationOutcome {
            iteration: session.plan.iteration_count,
            result_id: outcome_ids.0,
            hypothesis_id: outcome_ids.1,
            duplicate,
            pattern,
            signals_applied,
            memory_id,
            decision,
        })
    }

    /// Build the terminal report for the session.
    pub async fn finish(&self, session: &ResearchSession) -> ConvergenceReport {
        self.convergence
            .generate_convergence_report(
                &session.plan,
                &session.hypotheses,
                &session.results,
                session.stopping_reason,
            )
            .await
    }

    async fn remember(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
        pattern: &PatternOutcome,
    ) -> Option<String> {
        match result.supports_hypothesis {
            Some(true) => Some(self.memory.add_success_memory(result, hypothesis, None).await),
            Some(false) => {
                let category = match pattern {
                    PatternOutcome::FailureLearned { category, .. } => *category,
                    _ => categorize_failure(result),
                };
                Some(
                    self.memory
                        .add_failure_memory(result, hypothesis, category.as_str())
                        .await,
                )
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MemoryCategory, ResultStatus};

    fn session() -> ResearchSession {
        ResearchSession::new(
            ResearchPlan::new("What improves recall?", 10),
            vec![
                Hypothesis::new("h1", "Caffeine improves recall", "neuroscience"),
                Hypothesis::new("h2", "Sleep improves recall", "neuroscience"),
            ],
        )
    }

    #[tokio::test]
    async fn test_iteration_updates_session_and_components() {
        let driver = ResearchIteration::from_config(&Config::default());
        let mut session = session();
        let result = ExperimentResult::new("r1", "h1", ResultStatus::Success, Some(true))
            .with_test("t_test", Some(0.01), Some(0.5));

        let outcome = driver.run(&mut session, result, None).await.unwrap();

        assert_eq!(outcome.iteration, 1);
        assert_eq!(outcome.signals_applied, 2);
        assert!(outcome.memory_id.is_some());
        assert!(!outcome.decision.should_stop);
        assert!(session.plan.supported_hypotheses.contains("h1"));
        let confidence = session.hypothesis("h1").and_then(|h| h.confidence_score);
        assert!((confidence.unwrap() - 0.8).abs() < 1e-9);

        let stats = driver.memory().get_memory_statistics().await;
        assert_eq!(stats.by_category[&MemoryCategory::SuccessPatterns], 1);
        assert_eq!(stats.experiment_signatures, 1);
        assert!(driver.feedback().pending_signals().await.is_empty());
    }

    #[tokio::test]
    async fn test_stops_when_everything_tested() {
        let driver = ResearchIteration::from_config(&Config::default());
        let mut session = session();

        let first = ExperimentResult::new("r1", "h1", ResultStatus::Success, Some(false));
        let second = ExperimentResult::new("r2", "h2", ResultStatus::Failure, None);
        driver.run(&mut session, first, None).await.unwrap();
        let outcome = driver.run(&mut session, second, None).await.unwrap();

        assert!(outcome.decision.should_stop);
        assert_eq!(outcome.decision.reason, StoppingReason::NoTestableHypotheses);
        assert!(session.has_converged());

        let report = driver.finish(&session).await;
        assert_eq!(report.stopping_reason, Some(StoppingReason::NoTestableHypotheses));
        assert_eq!(report.rejected_hypotheses, vec!["Caffeine improves recall"]);
    }

    #[tokio::test]
    async fn test_repeated_experiment_is_flagged() {
        let driver = ResearchIteration::from_config(&Config::default());
        let mut session = session();
        let protocol = ExperimentProtocol::new("rct", "double blind");

        let r1 = ExperimentResult::new("r1", "h1", ResultStatus::Partial, None);
        let r2 = ExperimentResult::new("r2", "h1", ResultStatus::Partial, None);
        driver.run(&mut session, r1, Some(&protocol)).await.unwrap();
        let outcome = driver.run(&mut session, r2, Some(&protocol)).await.unwrap();

        assert_eq!(outcome.duplicate, DuplicateCheck::ExactDuplicate);
        assert_eq!(outcome.pattern, Some(PatternOutcome::NotApplicable));
        assert!(outcome.memory_id.is_none());
    }
}
