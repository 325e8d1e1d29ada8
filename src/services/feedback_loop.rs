//! Feedback loop service.
//!
//! Learns from experiment outcomes:
//! 1. Classify: success, failure or inconclusive
//! 2. Learn: merge the result into a success pattern (keyed by test type)
//!    or a failure pattern (keyed by failure category)
//! 3. Signal: queue pattern and hypothesis-update signals for application
//!
//! Signals move from the pending queue to the applied queue exactly once.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::feedback::{
    ExperimentDesign, FailureCharacteristics, HypothesisCharacteristics, ResultSummary,
    StatisticalApproach,
};
use crate::domain::models::{
    ConfidenceAction, ConfidenceChange, ExperimentResult, FailureCategory, FailurePattern,
    FeedbackChanges, FeedbackConfig, FeedbackSignal, Hypothesis, LearningSummary, PatternAction,
    PatternOutcome, ResultFeedback, ResultStatus, SignalPayload, SkipReason, SuccessPattern,
};

/// Significance level used to categorize failures.
const SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Absolute effect size below which a non-significant result is underpowered.
const SMALL_EFFECT: f64 = 0.2;
/// Confidence of a freshly learned success pattern.
const INITIAL_PATTERN_CONFIDENCE: f64 = 0.5;
const FAILURE_SIGNAL_CONFIDENCE: f64 = 0.8;
/// Confidence assumed for hypotheses that were never scored.
const DEFAULT_HYPOTHESIS_CONFIDENCE: f64 = 0.5;
/// Weight assumed for strategies missing from the weight table.
const DEFAULT_STRATEGY_WEIGHT: f64 = 0.5;

/// Classification of a single result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Inconclusive,
}

fn classify(result: &ExperimentResult) -> Outcome {
    if result.status == ResultStatus::Success && result.supports_hypothesis == Some(true) {
        Outcome::Success
    } else if result.status == ResultStatus::Failure || result.supports_hypothesis == Some(false)
    {
        Outcome::Failure
    } else {
        Outcome::Inconclusive
    }
}

/// Categorize a failed result.
///
/// Execution errors take precedence; the statistical categories need both a
/// p-value and an effect size.
pub fn categorize_failure(result: &ExperimentResult) -> FailureCategory {
    if result.status == ResultStatus::Failure {
        return FailureCategory::ExecutionError;
    }

    match (result.primary_p_value, result.primary_effect_size) {
        (Some(p), Some(effect)) if p > SIGNIFICANCE_LEVEL => {
            if effect.abs() < SMALL_EFFECT {
                FailureCategory::Underpowered
            } else {
                FailureCategory::Statistical
            }
        }
        _ => FailureCategory::Conceptual,
    }
}

/// Internal state for the feedback loop.
#[derive(Debug, Default)]
struct FeedbackState {
    success_patterns: BTreeMap<String, SuccessPattern>,
    failure_patterns: BTreeMap<String, FailurePattern>,
    pending: Vec<FeedbackSignal>,
    applied: Vec<FeedbackSignal>,
}

impl FeedbackState {
    fn is_known(&self, id: Uuid) -> bool {
        self.pending.iter().any(|s| s.id == id) || self.applied.iter().any(|s| s.id == id)
    }
}

/// Feedback loop service.
pub struct FeedbackLoop {
    config: FeedbackConfig,
    state: Arc<RwLock<FeedbackState>>,
}

impl FeedbackLoop {
    pub fn new(config: FeedbackConfig) -> Self {
        tracing::info!(
            success_rate = config.success_learning_rate,
            failure_rate = config.failure_learning_rate,
            "FeedbackLoop initialized"
        );
        Self {
            config,
            state: Arc::new(RwLock::new(FeedbackState::default())),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(FeedbackConfig::default())
    }

    /// Learn from one experiment result and queue the resulting signals.
    pub async fn process_result_feedback(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
    ) -> ResultFeedback {
        tracing::debug!(result_id = %result.id, hypothesis_id = %hypothesis.id, "Processing result feedback");

        let mut state = self.state.write().await;
        let mut signals = Vec::with_capacity(2);

        let pattern = match classify(result) {
            Outcome::Success => match success_skip_reason(result) {
                Some(reason) => {
                    tracing::warn!(result_id = %result.id, %reason, "Skipping success pattern extraction");
                    PatternOutcome::Skipped { reason }
                }
                None => {
                    let (pattern, merged) = self.learn_success(&mut state, result, hypothesis);
                    signals.push(FeedbackSignal::new(
                        result.id.clone(),
                        SignalPayload::SuccessPattern {
                            pattern_id: pattern.pattern_id.clone(),
                            action: PatternAction::IncreasePriority,
                            target: "similar_hypotheses".to_string(),
                            pattern: pattern.clone(),
                        },
                        pattern.confidence,
                    ));
                    PatternOutcome::SuccessLearned {
                        pattern_id: pattern.pattern_id,
                        merged,
                    }
                }
            },
            Outcome::Failure => {
                let category = categorize_failure(result);
                let (pattern, merged) = learn_failure(&mut state, result, hypothesis, category);
                signals.push(FeedbackSignal::new(
                    result.id.clone(),
                    SignalPayload::FailurePattern {
                        pattern_id: pattern.pattern_id.clone(),
                        action: PatternAction::AvoidPattern,
                        recommended_fixes: pattern.recommended_fixes.clone(),
                        pattern: pattern.clone(),
                    },
                    FAILURE_SIGNAL_CONFIDENCE,
                ));
                PatternOutcome::FailureLearned {
                    pattern_id: pattern.pattern_id,
                    category,
                    merged,
                }
            }
            Outcome::Inconclusive => PatternOutcome::NotApplicable,
        };

        signals.push(self.hypothesis_update_signal(result, hypothesis));
        state.pending.extend(signals.iter().cloned());

        tracing::info!(
            result_id = %result.id,
            signals = signals.len(),
            pattern = ?pattern,
            "Generated feedback signals"
        );

        ResultFeedback { signals, pattern }
    }

    /// Apply a signal to the hypotheses (and optionally strategy weights).
    ///
    /// Returns `SignalAlreadyApplied` if the signal has been applied before;
    /// in that case nothing is changed.
    pub async fn apply_feedback(
        &self,
        signal: &FeedbackSignal,
        hypotheses: &mut [Hypothesis],
        strategy_weights: Option<&mut HashMap<String, f64>>,
    ) -> DomainResult<FeedbackChanges> {
        let mut state = self.state.write().await;

        if state.applied.iter().any(|s| s.id == signal.id) {
            return Err(DomainError::SignalAlreadyApplied(signal.id));
        }
        if let Some(field) = non_finite_amount(&signal.payload) {
            return Err(DomainError::ValidationFailed(format!(
                "signal {} carries a non-finite {field}",
                signal.id
            )));
        }

        tracing::info!(signal_id = %signal.id, kind = %signal.kind(), "Applying feedback signal");

        let mut changes = FeedbackChanges::default();

        match &signal.payload {
            SignalPayload::HypothesisUpdate {
                hypothesis_id,
                action,
                update_value,
                ..
            } => match hypotheses.iter_mut().find(|h| &h.id == hypothesis_id) {
                None => {
                    tracing::warn!(%hypothesis_id, "Hypothesis for update signal not found");
                    changes.unresolved_hypotheses.push(hypothesis_id.clone());
                }
                Some(hypothesis) => {
                    let delta = match action {
                        ConfidenceAction::IncreaseConfidence => Some(*update_value),
                        ConfidenceAction::DecreaseConfidence => Some(-*update_value),
                        ConfidenceAction::NoChange => None,
                    };
                    if let Some(delta) = delta {
                        let previous = hypothesis.confidence_score;
                        let updated = (previous.unwrap_or(DEFAULT_HYPOTHESIS_CONFIDENCE) + delta)
                            .clamp(0.0, 1.0);
                        hypothesis.confidence_score = Some(updated);
                        changes.hypotheses_updated.push(ConfidenceChange {
                            hypothesis_id: hypothesis_id.clone(),
                            previous,
                            updated,
                        });
                    }
                }
            },
            SignalPayload::SuccessPattern { .. } => {
                changes
                    .strategies_adjusted
                    .push("success_pattern_applied".to_string());
            }
            SignalPayload::FailurePattern { .. } => {
                changes
                    .strategies_adjusted
                    .push("failure_pattern_avoided".to_string());
            }
            SignalPayload::StrategyAdjustment { strategy, delta } => match strategy_weights {
                Some(weights) => {
                    let weight = weights
                        .entry(strategy.clone())
                        .or_insert(DEFAULT_STRATEGY_WEIGHT);
                    *weight = (*weight + delta).clamp(0.0, 1.0);
                    changes.strategies_adjusted.push(strategy.clone());
                }
                None => {
                    tracing::debug!(%strategy, "No strategy weights supplied, adjustment ignored");
                }
            },
            SignalPayload::TemplateUpdate { template, .. } => {
                changes.templates_modified.push(template.clone());
            }
            SignalPayload::PriorityChange { hypothesis_id, .. } => {
                changes.priorities_changed.push(hypothesis_id.clone());
            }
        }

        if let Some(pos) = state.pending.iter().position(|s| s.id == signal.id) {
            state.pending.remove(pos);
        }
        let mut applied = signal.clone();
        applied.applied = true;
        state.applied.push(applied);

        Ok(changes)
    }

    /// Queue an externally built signal as pending.
    ///
    /// Signals already pending or applied are ignored.
    pub async fn submit_signal(&self, mut signal: FeedbackSignal) {
        let mut state = self.state.write().await;
        if state.is_known(signal.id) {
            tracing::warn!(signal_id = %signal.id, "Signal already queued, ignoring");
            return;
        }
        signal.applied = false;
        state.pending.push(signal);
    }

    pub async fn success_patterns(&self) -> Vec<SuccessPattern> {
        self.state
            .read()
            .await
            .success_patterns
            .values()
            .cloned()
            .collect()
    }

    pub async fn failure_patterns(&self) -> Vec<FailurePattern> {
        self.state
            .read()
            .await
            .failure_patterns
            .values()
            .cloned()
            .collect()
    }

    pub async fn pending_signals(&self) -> Vec<FeedbackSignal> {
        self.state.read().await.pending.clone()
    }

    pub async fn applied_signals(&self) -> Vec<FeedbackSignal> {
        self.state.read().await.applied.clone()
    }

    /// Summarize what has been learned so far.
    pub async fn get_learning_summary(&self) -> LearningSummary {
        let state = self.state.read().await;

        LearningSummary {
            success_patterns_learned: state.success_patterns.len(),
            failure_patterns_learned: state.failure_patterns.len(),
            pending_signals: state.pending.len(),
            applied_signals: state.applied.len(),
            most_common_success: most_frequent(
                state
                    .success_patterns
                    .values()
                    .map(|p| (p.occurrences, p.description.as_str())),
            ),
            most_common_failure: most_frequent(
                state
                    .failure_patterns
                    .values()
                    .map(|p| (p.occurrences, p.description.as_str())),
            ),
        }
    }

    fn learn_success(
        &self,
        state: &mut FeedbackState,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
    ) -> (SuccessPattern, bool) {
        let pattern_id = format!("success:{}", result.primary_test);

        if let Some(existing) = state.success_patterns.get_mut(&pattern_id) {
            existing.merge(result.id.clone(), self.config.pattern_confidence_step);
            tracing::debug!(%pattern_id, occurrences = existing.occurrences, "Merged success pattern");
            return (existing.clone(), true);
        }

        let description = match result.primary_effect_size {
            Some(effect) => format!(
                "Successful {} with effect size {effect:.2}",
                result.primary_test
            ),
            None => format!("Successful {}", result.primary_test),
        };
        let now = Utc::now();
        let pattern = SuccessPattern {
            pattern_id: pattern_id.clone(),
            description,
            hypothesis_characteristics: HypothesisCharacteristics {
                domain: hypothesis.domain.clone(),
                testability_score: hypothesis.testability_score,
                novelty_score: hypothesis.novelty_score,
            },
            experiment_design: ExperimentDesign {
                test_type: result.primary_test.clone(),
                sample_size: result.sample_size,
            },
            statistical_approach: StatisticalApproach {
                p_value: result.primary_p_value,
                effect_size: result.primary_effect_size,
                effect_size_type: "Cohen's d".to_string(),
            },
            occurrences: 1,
            success_rate: 1.0,
            confidence: INITIAL_PATTERN_CONFIDENCE,
            examples: vec![result.id.clone()],
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(%pattern_id, "Learned new success pattern");
        state.success_patterns.insert(pattern_id, pattern.clone());
        (pattern, false)
    }

    fn hypothesis_update_signal(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
    ) -> FeedbackSignal {
        let (action, update_value) = match result.supports_hypothesis {
            Some(true) => (
                ConfidenceAction::IncreaseConfidence,
                self.config.success_learning_rate,
            ),
            Some(false) => (
                ConfidenceAction::DecreaseConfidence,
                self.config.failure_learning_rate,
            ),
            None => (ConfidenceAction::NoChange, 0.0),
        };

        FeedbackSignal::new(
            result.id.clone(),
            SignalPayload::HypothesisUpdate {
                hypothesis_id: hypothesis.id.clone(),
                action,
                update_value,
                result_summary: ResultSummary {
                    supports: result.supports_hypothesis,
                    p_value: result.primary_p_value,
                    effect_size: result.primary_effect_size,
                },
            },
            1.0,
        )
    }
}

fn learn_failure(
    state: &mut FeedbackState,
    result: &ExperimentResult,
    hypothesis: &Hypothesis,
    category: FailureCategory,
) -> (FailurePattern, bool) {
    let pattern_id = format!("failure:{category}");

    if let Some(existing) = state.failure_patterns.get_mut(&pattern_id) {
        existing.merge(result.id.clone());
        tracing::debug!(%pattern_id, occurrences = existing.occurrences, "Merged failure pattern");
        return (existing.clone(), true);
    }

    let now = Utc::now();
    let pattern = FailurePattern {
        pattern_id: pattern_id.clone(),
        description: format!("{} failure in {}", category.label(), result.primary_test),
        failure_type: category,
        common_characteristics: FailureCharacteristics {
            domain: hypothesis.domain.clone(),
            test_type: result.primary_test.clone(),
        },
        recommended_fixes: category.recommended_fixes(),
        occurrences: 1,
        examples: vec![result.id.clone()],
        created_at: now,
        updated_at: now,
    };

    tracing::debug!(%pattern_id, "Learned new failure pattern");
    state.failure_patterns.insert(pattern_id, pattern.clone());
    (pattern, false)
}

fn success_skip_reason(result: &ExperimentResult) -> Option<SkipReason> {
    if result.primary_test.trim().is_empty() {
        return Some(SkipReason::MissingTestType);
    }
    for (field, value) in [
        ("p_value", result.primary_p_value),
        ("effect_size", result.primary_effect_size),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Some(SkipReason::NonFiniteStatistic {
                field: field.to_string(),
            });
        }
    }
    None
}

/// Name of the numeric payload field that would corrupt a clamped score.
fn non_finite_amount(payload: &SignalPayload) -> Option<&'static str> {
    match payload {
        SignalPayload::HypothesisUpdate { update_value, .. } if !update_value.is_finite() => {
            Some("update_value")
        }
        SignalPayload::StrategyAdjustment { delta, .. } if !delta.is_finite() => Some("delta"),
        _ => None,
    }
}

/// Description with the highest occurrence count; the earliest id wins ties.
fn most_frequent<'a>(patterns: impl Iterator<Item = (u32, &'a str)>) -> Option<String> {
    let mut best: Option<(u32, &str)> = None;
    for (occurrences, description) in patterns {
        match best {
            Some((top, _)) if occurrences <= top => {}
            _ => best = Some((occurrences, description)),
        }
    }
    best.map(|(_, description)| description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SignalKind;

    fn hypothesis() -> Hypothesis {
        Hypothesis::new("h1", "Caffeine improves recall", "neuroscience")
            .with_novelty(0.6)
            .with_testability(0.8)
    }

    fn success(id: &str) -> ExperimentResult {
        ExperimentResult::new(id, "h1", ResultStatus::Success, Some(true))
            .with_test("t_test", Some(0.01), Some(0.6))
    }

    #[tokio::test]
    async fn test_success_creates_then_merges_pattern() {
        let feedback = FeedbackLoop::with_default_config();
        let h = hypothesis();

        let first = feedback.process_result_feedback(&success("r1"), &h).await;
        assert_eq!(
            first.pattern,
            PatternOutcome::SuccessLearned {
                pattern_id: "success:t_test".to_string(),
                merged: false
            }
        );
        assert_eq!(first.signals.len(), 2);
        assert_eq!(first.signals[0].kind(), SignalKind::SuccessPattern);
        assert!((first.signals[0].confidence - 0.5).abs() < f64::EPSILON);

        let second = feedback.process_result_feedback(&success("r2"), &h).await;
        assert!(matches!(
            second.pattern,
            PatternOutcome::SuccessLearned { merged: true, .. }
        ));
        assert!((second.signals[0].confidence - 0.6).abs() < 1e-9);

        let patterns = feedback.success_patterns().await;
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 2);
        assert_eq!(patterns[0].examples, vec!["r1", "r2"]);
        assert_eq!(feedback.pending_signals().await.len(), 4);
    }

    #[test]
    fn test_failure_categories() {
        let execution = ExperimentResult::new("r", "h", ResultStatus::Failure, None);
        assert_eq!(categorize_failure(&execution), FailureCategory::ExecutionError);

        let small = ExperimentResult::new("r", "h", ResultStatus::Success, Some(false))
            .with_test("t_test", Some(0.3), Some(-0.1));
        assert_eq!(categorize_failure(&small), FailureCategory::Underpowered);

        let large = small.clone().with_test("t_test", Some(0.3), Some(0.5));
        assert_eq!(categorize_failure(&large), FailureCategory::Statistical);

        let missing = small.clone().with_test("t_test", Some(0.3), None);
        assert_eq!(categorize_failure(&missing), FailureCategory::Conceptual);

        let significant = small.with_test("t_test", Some(0.01), Some(0.5));
        assert_eq!(categorize_failure(&significant), FailureCategory::Conceptual);
    }

    #[tokio::test]
    async fn test_failure_signal_carries_fixes() {
        let feedback = FeedbackLoop::with_default_config();
        let result = ExperimentResult::new("r1", "h1", ResultStatus::Success, Some(false))
            .with_test("anova", Some(0.4), Some(0.05));

        let out = feedback.process_result_feedback(&result, &hypothesis()).await;

        match &out.signals[0].payload {
            SignalPayload::FailurePattern {
                pattern_id,
                action,
                recommended_fixes,
                ..
            } => {
                assert_eq!(pattern_id, "failure:underpowered");
                assert_eq!(*action, PatternAction::AvoidPattern);
                assert_eq!(recommended_fixes[0], "Increase sample size");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!((out.signals[0].confidence - 0.8).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_test_type_is_skipped_but_updates_hypothesis() {
        let feedback = FeedbackLoop::with_default_config();
        let result = ExperimentResult::new("r1", "h1", ResultStatus::Success, Some(true));

        let out = feedback.process_result_feedback(&result, &hypothesis()).await;

        assert_eq!(
            out.pattern,
            PatternOutcome::Skipped {
                reason: SkipReason::MissingTestType
            }
        );
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].kind(), SignalKind::HypothesisUpdate);
        assert!(feedback.success_patterns().await.is_empty());
    }

    #[tokio::test]
    async fn test_inconclusive_only_emits_no_change() {
        let feedback = FeedbackLoop::with_default_config();
        let result = ExperimentResult::new("r1", "h1", ResultStatus::Partial, None);

        let out = feedback.process_result_feedback(&result, &hypothesis()).await;

        assert_eq!(out.pattern, PatternOutcome::NotApplicable);
        assert!(matches!(
            out.signals[0].payload,
            SignalPayload::HypothesisUpdate {
                action: ConfidenceAction::NoChange,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_apply_moves_signal_and_rejects_reapply() {
        let feedback = FeedbackLoop::with_default_config();
        let mut hypotheses = vec![hypothesis()];

        let out = feedback
            .process_result_feedback(&success("r1"), &hypotheses[0])
            .await;
        let update = out.signals[1].clone();

        let changes = feedback
            .apply_feedback(&update, &mut hypotheses, None)
            .await
            .unwrap();
        assert_eq!(changes.hypotheses_updated.len(), 1);
        assert!((hypotheses[0].confidence_score.unwrap() - 0.8).abs() < 1e-9);

        let pending = feedback.pending_signals().await;
        assert_eq!(pending.len(), 1);
        assert!(pending.iter().all(|s| s.id != update.id));
        assert!(feedback.applied_signals().await[0].applied);

        let err = feedback
            .apply_feedback(&update, &mut hypotheses, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SignalAlreadyApplied(id) if id == update.id));
        assert!((hypotheses[0].confidence_score.unwrap() - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_hypothesis_is_unresolved() {
        let feedback = FeedbackLoop::with_default_config();
        let signal = FeedbackSignal::new(
            "r9",
            SignalPayload::HypothesisUpdate {
                hypothesis_id: "ghost".to_string(),
                action: ConfidenceAction::DecreaseConfidence,
                update_value: 0.4,
                result_summary: ResultSummary {
                    supports: Some(false),
                    p_value: None,
                    effect_size: None,
                },
            },
            1.0,
        );

        let changes = feedback
            .apply_feedback(&signal, &mut [], None)
            .await
            .unwrap();

        assert!(changes.is_empty());
        assert_eq!(changes.unresolved_hypotheses, vec!["ghost"]);
        assert_eq!(feedback.applied_signals().await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_finite_delta_rejected() {
        let feedback = FeedbackLoop::with_default_config();
        let mut weights = HashMap::from([("broad".to_string(), 0.4)]);
        let signal = FeedbackSignal::new(
            "planner",
            SignalPayload::StrategyAdjustment {
                strategy: "broad".to_string(),
                delta: f64::NAN,
            },
            0.5,
        );
        feedback.submit_signal(signal.clone()).await;

        let err = feedback
            .apply_feedback(&signal, &mut [], Some(&mut weights))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert!((weights["broad"] - 0.4).abs() < f64::EPSILON);
        assert_eq!(feedback.pending_signals().await.len(), 1);
        assert!(feedback.applied_signals().await.is_empty());
    }

    #[tokio::test]
    async fn test_strategy_adjustment_clamps_weight() {
        let feedback = FeedbackLoop::with_default_config();
        let mut weights = HashMap::from([("literature_first".to_string(), 0.9)]);
        let signal = FeedbackSignal::new(
            "planner",
            SignalPayload::StrategyAdjustment {
                strategy: "literature_first".to_string(),
                delta: 0.3,
            },
            1.0,
        );
        feedback.submit_signal(signal.clone()).await;

        let changes = feedback
            .apply_feedback(&signal, &mut [], Some(&mut weights))
            .await
            .unwrap();

        assert_eq!(changes.strategies_adjusted, vec!["literature_first"]);
        assert!((weights["literature_first"] - 1.0).abs() < f64::EPSILON);
        assert!(feedback.pending_signals().await.is_empty());
    }

    #[tokio::test]
    async fn test_learning_summary_prefers_most_frequent() {
        let feedback = FeedbackLoop::with_default_config();
        let h = hypothesis();
        feedback.process_result_feedback(&success("r1"), &h).await;
        let chi = ExperimentResult::new("r2", "h1", ResultStatus::Success, Some(true))
            .with_test("chi_square", Some(0.02), Some(0.4));
        feedback.process_result_feedback(&chi, &h).await;
        feedback.process_result_feedback(&chi, &h).await;

        let summary = feedback.get_learning_summary().await;

        assert_eq!(summary.success_patterns_learned, 2);
        assert_eq!(summary.pending_signals, 6);
        assert_eq!(
            summary.most_common_success.as_deref(),
            Some("Successful chi_square with effect size 0.40")
        );
        assert!(summary.most_common_failure.is_none());
    }
}
