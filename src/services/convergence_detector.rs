//! Convergence detection for the research loop.
//!
//! Decides after each iteration whether research should stop:
//! 1. Recompute progress metrics from the plan, hypotheses and results
//! 2. Evaluate mandatory criteria in configured order
//! 3. Evaluate optional criteria in configured order
//!
//! The first criterion that fires wins. A mandatory stop is therefore never
//! masked by an optional criterion.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::convergence::is_non_increasing;
use crate::domain::models::{
    ConvergenceConfig, ConvergenceMetrics, ConvergenceReport, CriterionKind, CriterionSlot,
    ExperimentResult, Hypothesis, ResearchPlan, StoppingDecision, StoppingReason,
};

/// Novelty above which related areas are worth exploring.
const HIGH_NOVELTY: f64 = 0.7;
/// Discovery rate below which the experimental approach needs refinement.
const LOW_DISCOVERY_RATE: f64 = 0.2;
/// Trailing hypothesis novelty values inspected for `novelty_declining`.
const NOVELTY_DECLINE_SPAN: usize = 3;

/// Internal state for the detector.
#[derive(Debug, Default)]
struct DetectorState {
    metrics: ConvergenceMetrics,
    /// Cost reported through `record_cost`, outside of any result.
    external_cost: f64,
}

/// Convergence detector service.
pub struct ConvergenceDetector {
    config: ConvergenceConfig,
    mandatory: Vec<CriterionSlot>,
    optional: Vec<CriterionSlot>,
    state: Arc<RwLock<DetectorState>>,
}

impl ConvergenceDetector {
    pub fn new(config: ConvergenceConfig) -> Self {
        let mandatory = parse_criteria(&config.mandatory_criteria);
        let optional = parse_criteria(&config.optional_criteria);

        tracing::info!(
            mandatory = ?config.mandatory_criteria,
            optional = ?config.optional_criteria,
            window = config.novelty_decline_window,
            "ConvergenceDetector initialized"
        );

        Self {
            config,
            mandatory,
            optional,
            state: Arc::new(RwLock::new(DetectorState::default())),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(ConvergenceConfig::default())
    }

    /// Check whether research should stop.
    ///
    /// Every call updates the metrics, including appending one point to the
    /// novelty trend, so calling it twice with the same inputs is not a no-op.
    pub async fn check_convergence(
        &self,
        plan: &ResearchPlan,
        hypotheses: &[Hypothesis],
        results: &[ExperimentResult],
    ) -> StoppingDecision {
        let mut state = self.state.write().await;
        self.update_metrics(&mut state, plan, hypotheses, results);

        for slot in &self.mandatory {
            let decision = self.evaluate(slot, true, plan, &state.metrics);
            if decision.should_stop {
                tracing::info!(
                    criterion = %decision.reason,
                    details = %decision.details,
                    "Mandatory stopping criterion met"
                );
                return decision;
            }
        }

        for slot in &self.optional {
            let decision = self.evaluate(slot, false, plan, &state.metrics);
            if decision.should_stop {
                tracing::info!(
                    criterion = %decision.reason,
                    confidence = decision.confidence,
                    details = %decision.details,
                    "Optional stopping criterion met"
                );
                return decision;
            }
        }

        tracing::debug!(
            iteration = plan.iteration_count,
            discovery_rate = state.metrics.discovery_rate,
            novelty = state.metrics.novelty_score,
            "No stopping criteria met"
        );
        StoppingDecision::continue_research()
    }

    /// Build the terminal report for a session.
    pub async fn generate_convergence_report(
        &self,
        plan: &ResearchPlan,
        hypotheses: &[Hypothesis],
        results: &[ExperimentResult],
        stopping_reason: Option<StoppingReason>,
    ) -> ConvergenceReport {
        tracing::info!("Generating convergence report");

        let metrics = {
            let mut state = self.state.write().await;
            self.update_metrics(&mut state, plan, hypotheses, results);
            state.metrics.clone()
        };

        let supported_hypotheses: Vec<String> = hypotheses
            .iter()
            .filter(|h| plan.supported_hypotheses.contains(&h.id))
            .map(|h| h.statement.clone())
            .collect();
        let rejected_hypotheses: Vec<String> = hypotheses
            .iter()
            .filter(|h| plan.rejected_hypotheses.contains(&h.id))
            .map(|h| h.statement.clone())
            .collect();

        let summary = build_summary(plan, hypotheses.len(), results.len(), &metrics);
        let recommended_next_steps = recommend_next_steps(plan, &metrics);

        ConvergenceReport {
            research_question: plan.research_question.clone(),
            converged: plan.has_converged,
            stopping_reason,
            total_iterations: plan.iteration_count,
            total_hypotheses: hypotheses.len(),
            hypotheses_supported: plan.supported_hypotheses.len(),
            hypotheses_rejected: plan.rejected_hypotheses.len(),
            experiments_conducted: results.len(),
            supported_hypotheses,
            rejected_hypotheses,
            final_metrics: metrics,
            research_complete: plan.has_converged,
            recommended_next_steps,
            summary,
            generated_at: chrono::Utc::now(),
        }
    }

    /// Snapshot of the current metrics.
    pub async fn metrics(&self) -> ConvergenceMetrics {
        self.state.read().await.metrics.clone()
    }

    /// Record cost incurred outside of any experiment result.
    pub async fn record_cost(&self, amount: f64) {
        if !amount.is_finite() || amount < 0.0 {
            tracing::warn!(amount, "Ignoring invalid cost");
            return;
        }
        let mut state = self.state.write().await;
        state.external_cost += amount;
    }

    /// `listed_mandatory` is the list the slot came from. It only tags
    /// unrecognized names; known kinds carry their own mandatoriness.
    fn evaluate(
        &self,
        slot: &CriterionSlot,
        listed_mandatory: bool,
        plan: &ResearchPlan,
        metrics: &ConvergenceMetrics,
    ) -> StoppingDecision {
        match slot {
            CriterionSlot::Known(kind) => match kind {
                CriterionKind::IterationLimit => check_iteration_limit(plan),
                CriterionKind::NoTestableHypotheses => check_no_testable_hypotheses(plan),
                CriterionKind::NoveltyDecline => self.check_novelty_decline(metrics),
                CriterionKind::DiminishingReturns => self.check_diminishing_returns(metrics),
            },
            CriterionSlot::Unrecognized(name) => {
                tracing::warn!(criterion = %name, "Unknown criterion");
                StoppingDecision::new(
                    false,
                    StoppingReason::UnknownCriterion,
                    listed_mandatory,
                    0.0,
                    format!("Unknown criterion: {name}"),
                )
            }
        }
    }

    fn check_novelty_decline(&self, metrics: &ConvergenceMetrics) -> StoppingDecision {
        let is_mandatory = CriterionKind::NoveltyDecline.is_mandatory();
        let window = self.config.novelty_decline_window;
        let threshold = self.config.novelty_decline_threshold;

        let Some(recent) = metrics.recent_novelty(window) else {
            return StoppingDecision::new(
                false,
                StoppingReason::NoveltyDecline,
                is_mandatory,
                0.0,
                format!(
                    "Insufficient data ({}/{} points)",
                    metrics.novelty_trend.len(),
                    window
                ),
            );
        };

        let all_below = recent.iter().all(|v| *v < threshold);
        let should_stop = all_below || is_non_increasing(recent);

        StoppingDecision::new(
            should_stop,
            StoppingReason::NoveltyDecline,
            is_mandatory,
            if should_stop { 0.8 } else { 0.2 },
            format!("Recent novelty: {recent:?}, threshold: {threshold}"),
        )
    }

    fn check_diminishing_returns(&self, metrics: &ConvergenceMetrics) -> StoppingDecision {
        let is_mandatory = CriterionKind::DiminishingReturns.is_mandatory();
        let threshold = self.config.cost_per_discovery_threshold;

        let Some(cost_per_discovery) = metrics.cost_per_discovery else {
            return StoppingDecision::new(
                false,
                StoppingReason::DiminishingReturns,
                is_mandatory,
                0.0,
                "No cost data available",
            );
        };

        let should_stop = cost_per_discovery > threshold;

        StoppingDecision::new(
            should_stop,
            StoppingReason::DiminishingReturns,
            is_mandatory,
            if should_stop { 0.7 } else { 0.3 },
            format!("Cost per discovery: ${cost_per_discovery:.2} (threshold: ${threshold:.2})"),
        )
    }

    /// Overwrite the aggregate metrics and append one novelty observation.
    fn update_metrics(
        &self,
        state: &mut DetectorState,
        plan: &ResearchPlan,
        hypotheses: &[Hypothesis],
        results: &[ExperimentResult],
    ) {
        let total = results.len();
        let significant = results.iter().filter(|r| r.is_significant()).count();
        let support_rate = if total == 0 {
            0.0
        } else {
            significant as f64 / total as f64
        };

        let (novelty, declining) = current_novelty(hypotheses);
        let history_limit = self
            .config
            .novelty_history_limit
            .max(self.config.novelty_decline_window);

        let result_cost: f64 = results
            .iter()
            .filter_map(|r| r.cost)
            .filter(|c| c.is_finite() && *c >= 0.0)
            .sum();
        let total_cost = result_cost + state.external_cost;

        let metrics = &mut state.metrics;
        metrics.discovery_rate = support_rate;
        metrics.total_experiments = total;
        metrics.significant_results = significant;

        metrics.novelty_score = novelty;
        metrics.push_novelty(novelty, history_limit);
        metrics.novelty_declining = declining;

        metrics.saturation_ratio = plan.testability_rate();
        metrics.hypotheses_tested = plan.tested_hypotheses.len();
        metrics.total_hypotheses = plan.hypothesis_pool.len();

        metrics.consistency_score = support_rate;

        metrics.iteration_count = plan.iteration_count;
        metrics.max_iterations = plan.max_iterations;

        metrics.total_cost = total_cost;
        metrics.cost_per_discovery = if significant > 0 {
            Some(total_cost / significant as f64)
        } else {
            None
        };

        metrics.touch();
    }
}

fn parse_criteria(names: &[String]) -> Vec<CriterionSlot> {
    names
        .iter()
        .map(|name| {
            let slot = CriterionSlot::parse(name);
            if let CriterionSlot::Unrecognized(name) = &slot {
                tracing::warn!(criterion = %name, "Unrecognized stopping criterion configured");
            }
            slot
        })
        .collect()
}

fn check_iteration_limit(plan: &ResearchPlan) -> StoppingDecision {
    StoppingDecision::new(
        plan.iteration_count >= plan.max_iterations,
        StoppingReason::IterationLimit,
        CriterionKind::IterationLimit.is_mandatory(),
        1.0,
        format!("Iteration {}/{}", plan.iteration_count, plan.max_iterations),
    )
}

fn check_no_testable_hypotheses(plan: &ResearchPlan) -> StoppingDecision {
    let untested = plan.untested_hypotheses().len();
    let queued = plan.experiment_queue.len();

    StoppingDecision::new(
        untested == 0 && queued == 0,
        StoppingReason::NoTestableHypotheses,
        CriterionKind::NoTestableHypotheses.is_mandatory(),
        1.0,
        format!("{untested} untested hypotheses, {queued} queued experiments"),
    )
}

/// Most recent novelty in creation order, and whether the tail is declining.
fn current_novelty(hypotheses: &[Hypothesis]) -> (f64, bool) {
    let mut ordered: Vec<&Hypothesis> = hypotheses.iter().collect();
    ordered.sort_by_key(|h| h.created_at);

    let scores: Vec<f64> = ordered
        .iter()
        .filter_map(|h| h.novelty_score)
        .filter(|s| s.is_finite())
        .collect();

    let current = scores.last().copied().unwrap_or(0.0);
    let declining = scores.len() >= NOVELTY_DECLINE_SPAN
        && is_non_increasing(&scores[scores.len() - NOVELTY_DECLINE_SPAN..]);

    (current, declining)
}

fn build_summary(
    plan: &ResearchPlan,
    hypothesis_count: usize,
    result_count: usize,
    metrics: &ConvergenceMetrics,
) -> String {
    format!(
        "Research on \"{question}\" completed after {iterations} iterations.\n\n\
         Generated {hypothesis_count} hypotheses and conducted {result_count} experiments.\n\n\
         Results:\n\
         - {supported} hypotheses supported\n\
         - {rejected} hypotheses rejected\n\
         - {untested} hypotheses remain untested\n\n\
         Discovery rate: {discovery:.1}%\n\
         Final novelty score: {novelty:.2}\n\
         Research saturation: {saturation:.1}%\n",
        question = plan.research_question,
        iterations = plan.iteration_count,
        supported = plan.supported_hypotheses.len(),
        rejected = plan.rejected_hypotheses.len(),
        untested = plan.untested_hypotheses().len(),
        discovery = metrics.discovery_rate * 100.0,
        novelty = metrics.novelty_score,
        saturation = metrics.saturation_ratio * 100.0,
    )
}

fn recommend_next_steps(plan: &ResearchPlan, metrics: &ConvergenceMetrics) -> Vec<String> {
    let mut steps = Vec::new();

    if !plan.supported_hypotheses.is_empty() {
        steps.push("Replicate supported hypotheses in larger studies".to_string());
    }

    let untested = plan.untested_hypotheses().len();
    if untested > 0 {
        steps.push(format!("Test remaining {untested} hypotheses"));
    }

    if metrics.novelty_score > HIGH_NOVELTY {
        steps.push("Explore related high-novelty areas".to_string());
    }

    if metrics.discovery_rate < LOW_DISCOVERY_RATE {
        steps.push("Refine experimental approach to increase discovery rate".to_string());
    }

    steps.push("Document findings and prepare publication".to_string());
    steps
}
