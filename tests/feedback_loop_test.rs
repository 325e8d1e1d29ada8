//! Integration tests for the feedback loop.

mod common;

use std::collections::HashMap;

use common::{hypotheses_with_novelty, inconclusive, refuted, supported};
use kosmos::domain::models::{
    ConfidenceAction, FailureCategory, PatternOutcome, SignalKind, SignalPayload,
};
use kosmos::services::feedback_loop::categorize_failure;
use kosmos::{
    DomainError, ExperimentResult, FeedbackLoop, FeedbackSignal, Hypothesis, ResultStatus,
};

#[tokio::test]
async fn test_success_then_apply_raises_confidence() {
    let mut hypotheses = hypotheses_with_novelty(&[0.8]);
    let feedback = FeedbackLoop::with_default_config();

    let outcome = feedback
        .process_result_feedback(&supported("r1", "h1"), &hypotheses[0])
        .await;

    assert_eq!(outcome.signals.len(), 2);
    assert_eq!(outcome.signals[0].kind(), SignalKind::SuccessPattern);
    assert_eq!(outcome.signals[1].kind(), SignalKind::HypothesisUpdate);
    assert_eq!(
        outcome.pattern,
        PatternOutcome::SuccessLearned {
            pattern_id: "success:t_test".to_string(),
            merged: false,
        }
    );
    assert_eq!(feedback.pending_signals().await.len(), 2);

    for signal in &outcome.signals {
        feedback
            .apply_feedback(signal, &mut hypotheses, None)
            .await
            .unwrap();
    }

    // Unscored hypotheses start from 0.5.
    let confidence = hypotheses[0].confidence_score.unwrap();
    assert!((confidence - 0.8).abs() < 1e-9);
    assert!(feedback.pending_signals().await.is_empty());
    assert!(feedback.applied_signals().await.iter().all(|s| s.applied));
}

#[tokio::test]
async fn test_refutation_learns_failure_category() {
    let mut hypotheses = hypotheses_with_novelty(&[0.8]);
    hypotheses[0].confidence_score = Some(0.3);
    let feedback = FeedbackLoop::with_default_config();

    let outcome = feedback
        .process_result_feedback(&refuted("r1", "h1", 0.4, 0.1), &hypotheses[0])
        .await;

    match &outcome.pattern {
        PatternOutcome::FailureLearned {
            pattern_id,
            category,
            merged,
        } => {
            assert_eq!(pattern_id, "failure:underpowered");
            assert_eq!(*category, FailureCategory::Underpowered);
            assert!(!merged);
        }
        other => panic!("Expected a failure pattern, got {other:?}"),
    }

    match &outcome.signals[0].payload {
        SignalPayload::FailurePattern {
            recommended_fixes, ..
        } => assert_eq!(recommended_fixes[0], "Increase sample size"),
        other => panic!("Expected failure payload, got {other:?}"),
    }

    let update = &outcome.signals[1];
    let changes = feedback
        .apply_feedback(update, &mut hypotheses, None)
        .await
        .unwrap();

    // 0.3 - 0.4 clamps at zero.
    assert_eq!(hypotheses[0].confidence_score, Some(0.0));
    assert_eq!(changes.hypotheses_updated.len(), 1);
    assert_eq!(changes.hypotheses_updated[0].previous, Some(0.3));
}

#[tokio::test]
async fn test_repeat_successes_merge_into_one_pattern() {
    let hypotheses = hypotheses_with_novelty(&[0.8, 0.7]);
    let feedback = FeedbackLoop::with_default_config();

    feedback
        .process_result_feedback(&supported("r1", "h1"), &hypotheses[0])
        .await;
    let second = feedback
        .process_result_feedback(&supported("r2", "h2"), &hypotheses[1])
        .await;

    assert_eq!(
        second.pattern,
        PatternOutcome::SuccessLearned {
            pattern_id: "success:t_test".to_string(),
            merged: true,
        }
    );

    let patterns = feedback.success_patterns().await;
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].occurrences, 2);
    assert_eq!(patterns[0].examples, vec!["r1", "r2"]);
    assert!((patterns[0].confidence - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_inconclusive_result_has_no_pattern() {
    let mut hypotheses = hypotheses_with_novelty(&[0.8]);
    let feedback = FeedbackLoop::with_default_config();

    let outcome = feedback
        .process_result_feedback(&inconclusive("r1", "h1"), &hypotheses[0])
        .await;

    assert_eq!(outcome.pattern, PatternOutcome::NotApplicable);
    assert_eq!(outcome.signals.len(), 1);
    match &outcome.signals[0].payload {
        SignalPayload::HypothesisUpdate { action, .. } => {
            assert_eq!(*action, ConfidenceAction::NoChange);
        }
        other => panic!("Expected hypothesis update, got {other:?}"),
    }

    let changes = feedback
        .apply_feedback(&outcome.signals[0], &mut hypotheses, None)
        .await
        .unwrap();
    assert!(changes.is_empty());
    assert_eq!(hypotheses[0].confidence_score, None);
}

#[tokio::test]
async fn test_success_without_test_type_is_skipped() {
    let hypotheses = hypotheses_with_novelty(&[0.8]);
    let feedback = FeedbackLoop::with_default_config();
    let result = ExperimentResult::new("r1", "h1", ResultStatus::Success, Some(true));

    let outcome = feedback
        .process_result_feedback(&result, &hypotheses[0])
        .await;

    assert!(outcome.pattern.is_skipped());
    assert_eq!(outcome.signals.len(), 1);
    assert_eq!(outcome.signals[0].kind(), SignalKind::HypothesisUpdate);
    assert!(feedback.success_patterns().await.is_empty());
}

#[tokio::test]
async fn test_signal_cannot_be_applied_twice() {
    let mut hypotheses = hypotheses_with_novelty(&[0.8]);
    let feedback = FeedbackLoop::with_default_config();
    let outcome = feedback
        .process_result_feedback(&supported("r1", "h1"), &hypotheses[0])
        .await;
    let update = &outcome.signals[1];

    feedback
        .apply_feedback(update, &mut hypotheses, None)
        .await
        .unwrap();
    let err = feedback
        .apply_feedback(update, &mut hypotheses, None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::SignalAlreadyApplied(id) if id == update.id));
    let confidence = hypotheses[0].confidence_score.unwrap();
    assert!((confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_strategy_adjustment_clamps_weight() {
    let mut hypotheses: Vec<Hypothesis> = Vec::new();
    let feedback = FeedbackLoop::with_default_config();
    let mut weights = HashMap::from([("literature_first".to_string(), 0.9)]);

    let signal = FeedbackSignal::new(
        "analysis-1",
        SignalPayload::StrategyAdjustment {
            strategy: "literature_first".to_string(),
            delta: 0.5,
        },
        0.9,
    );
    feedback.submit_signal(signal.clone()).await;
    feedback.submit_signal(signal.clone()).await;
    assert_eq!(feedback.pending_signals().await.len(), 1);

    let changes = feedback
        .apply_feedback(&signal, &mut hypotheses, Some(&mut weights))
        .await
        .unwrap();

    assert_eq!(changes.strategies_adjusted, vec!["literature_first"]);
    assert_eq!(weights["literature_first"], 1.0);
}

#[tokio::test]
async fn test_learning_summary_counts() {
    let mut hypotheses = hypotheses_with_novelty(&[0.8, 0.7, 0.6]);
    let feedback = FeedbackLoop::with_default_config();

    let first = feedback
        .process_result_feedback(&supported("r1", "h1"), &hypotheses[0])
        .await;
    feedback
        .process_result_feedback(&refuted("r2", "h2", 0.5, 0.9), &hypotheses[1])
        .await;
    feedback
        .process_result_feedback(&refuted("r3", "h3", 0.6, 0.7), &hypotheses[2])
        .await;
    feedback
        .apply_feedback(&first.signals[0], &mut hypotheses, None)
        .await
        .unwrap();

    let summary = feedback.get_learning_summary().await;
    assert_eq!(summary.success_patterns_learned, 1);
    assert_eq!(summary.failure_patterns_learned, 1);
    assert_eq!(summary.applied_signals, 1);
    assert_eq!(summary.pending_signals, 5);
    assert_eq!(
        summary.most_common_failure.as_deref(),
        Some("Statistical failure in t_test")
    );
}

#[test]
fn test_categorize_failure() {
    let crashed = ExperimentResult::new("r1", "h1", ResultStatus::Failure, None);
    assert_eq!(categorize_failure(&crashed), FailureCategory::ExecutionError);

    assert_eq!(
        categorize_failure(&refuted("r2", "h1", 0.2, 0.05)),
        FailureCategory::Underpowered
    );
    assert_eq!(
        categorize_failure(&refuted("r3", "h1", 0.2, -0.6)),
        FailureCategory::Statistical
    );
    assert_eq!(
        categorize_failure(&refuted("r4", "h1", 0.01, 0.6)),
        FailureCategory::Conceptual
    );
}
