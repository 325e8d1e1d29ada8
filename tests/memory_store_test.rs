//! Integration tests for the memory store.

mod common;

use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::{refuted, supported};
use kosmos::domain::models::{DuplicateCheck, MemoryQuery};
use kosmos::{ExperimentProtocol, Hypothesis, Memory, MemoryCategory, MemoryConfig, MemoryStore};

fn hypothesis(id: &str, statement: &str) -> Hypothesis {
    Hypothesis::new(id, statement, "biology")
}

#[tokio::test]
async fn test_duplicate_detection_by_protocol() {
    let store = MemoryStore::with_default_config();
    let h = hypothesis("h1", "Temperature increases enzyme activity");
    let rct = ExperimentProtocol::new("rct", "double blind").with_id("p1");
    let survey = ExperimentProtocol::new("survey", "cross sectional");

    assert_eq!(
        store.is_duplicate_experiment(&h, Some(&rct)).await,
        DuplicateCheck::Unique
    );

    let signature = store.record_experiment(&h, Some(&rct)).await;
    assert_eq!(signature.len(), 64);

    assert_eq!(
        store.is_duplicate_experiment(&h, Some(&rct)).await,
        DuplicateCheck::ExactDuplicate
    );
    assert_eq!(
        store.is_duplicate_experiment(&h, Some(&survey)).await,
        DuplicateCheck::SimilarHypothesis { times: 1 }
    );

    // Same statement under another id is still the same experiment.
    let twin = hypothesis("h9", "Temperature increases enzyme activity");
    assert!(store.is_duplicate_experiment(&twin, Some(&rct)).await.is_duplicate());

    // Recording the same experiment again keeps one signature.
    let again = store.record_experiment(&h, Some(&rct)).await;
    assert_eq!(again, signature);
    assert_eq!(store.get_memory_statistics().await.experiment_signatures, 1);
}

#[tokio::test]
async fn test_missing_protocol_is_its_own_signature() {
    let store = MemoryStore::with_default_config();
    let h = hypothesis("h1", "Light exposure shifts circadian phase");

    store.record_experiment(&h, None).await;

    let check = store.is_duplicate_experiment(&h, None).await;
    assert_eq!(check, DuplicateCheck::ExactDuplicate);
    assert_eq!(
        check.reason().as_deref(),
        Some("Exact duplicate (same hypothesis + same protocol)")
    );

    let protocol = ExperimentProtocol::new("rct", "single blind");
    assert_eq!(
        store.is_duplicate_experiment(&h, Some(&protocol)).await.as_tuple(),
        (true, Some("Similar hypothesis tested 1 time(s)".to_string()))
    );
}

#[tokio::test]
async fn test_query_ranks_and_records_access() {
    let store = MemoryStore::with_default_config();
    let h = hypothesis("h1", "Temperature increases enzyme activity");

    store
        .add_success_memory(&supported("r1", "h1"), &h, Some("replicates"))
        .await;
    store
        .add_failure_memory(&refuted("r2", "h1", 0.4, 0.1), &h, "underpowered")
        .await;
    store
        .add_insight_memory("Heat denatures proteins past 60C", "analysis", &["h1".to_string()])
        .await;

    let found = store.query_memory(&MemoryQuery::new().limit(2)).await;
    assert_eq!(found.len(), 2);
    // Insight (0.95) outranks success (0.8) at equal age.
    assert_eq!(found[0].category, MemoryCategory::Insights);
    assert_eq!(found[1].category, MemoryCategory::SuccessPatterns);
    assert!(found.iter().all(|m| m.access_count == 1));

    // The failure memory fell outside the limit, so it was not touched.
    let untouched = store
        .export_memories(Some(MemoryCategory::FailurePatterns))
        .await;
    assert_eq!(untouched.len(), 1);
    assert_eq!(untouched[0].access_count, 0);

    let failures = store
        .query_memory(&MemoryQuery::new().tag("underpowered"))
        .await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].content.starts_with("Failure: Temperature increases"));

    let none = store
        .query_memory(&MemoryQuery::new().min_importance(0.99))
        .await;
    assert!(none.is_empty());

    let stats = store.get_memory_statistics().await;
    assert_eq!(stats.total_memories, 3);
    assert_eq!(stats.by_category[&MemoryCategory::Insights], 1);
    assert_eq!(
        stats.highest_importance.as_deref(),
        Some("Heat denatures proteins past 60C")
    );
}

#[tokio::test]
async fn test_search_similar_hypothesis_needs_three_shared_words() {
    let store = MemoryStore::with_default_config();
    let tested = hypothesis("h1", "Temperature increases enzyme activity in yeast");
    store
        .add_dead_end_memory(&tested, "no effect across 12 trials")
        .await;
    store
        .add_insight_memory("temperature increases enzyme activity", "notes", &[])
        .await;

    let close = hypothesis("h2", "Does temperature increase enzyme activity in bacteria");
    let similar = store.search_similar_hypothesis(&close).await;
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].category, MemoryCategory::DeadEnds);

    let far = hypothesis("h3", "Sleep improves memory");
    assert!(store.search_similar_hypothesis(&far).await.is_empty());
}

#[tokio::test]
async fn test_overflow_prunes_stale_unimportant_memories() {
    // Five memories per category.
    let store = MemoryStore::new(MemoryConfig {
        max_memories: 25,
        prune_after_days: 30,
        min_importance_to_keep: 0.3,
    });

    let old = Utc::now() - Duration::days(90);
    let stale: Vec<Memory> = (0..5)
        .map(|i| {
            Memory::new(format!("old-{i}"), MemoryCategory::General, format!("note {i}"), 0.1)
                .with_created_at(old)
        })
        .collect();
    assert_eq!(store.import_memories(stale).await, 5);

    // The sixth general memory overflows the category.
    store
        .add_memory(MemoryCategory::General, "fresh note", HashMap::new(), 0.1, vec![])
        .await;

    let general = store.export_memories(Some(MemoryCategory::General)).await;
    assert_eq!(general.len(), 1);
    assert_eq!(general[0].content, "fresh note");
}

#[tokio::test]
async fn test_accessed_memories_survive_pruning() {
    let store = MemoryStore::with_default_config();
    let old = Utc::now() - Duration::days(400);
    let memories = vec![
        Memory::new("kept", MemoryCategory::General, "looked up once", 0.1).with_created_at(old),
        Memory::new("dropped", MemoryCategory::General, "never read", 0.1).with_created_at(old),
        Memory::new("important", MemoryCategory::DeadEnds, "dead end", 0.9).with_created_at(old),
    ];
    store.import_memories(memories).await;

    let read = store
        .query_memory(&MemoryQuery::new().category(MemoryCategory::General).limit(1))
        .await;
    assert_eq!(read.len(), 1);
    let read_id = read[0].id.clone();

    assert_eq!(store.prune_old_memories().await, 1);

    let remaining: Vec<String> = store
        .export_memories(None)
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&read_id));
    assert!(remaining.contains(&"important".to_string()));
}

#[tokio::test]
async fn test_export_import_round_trip_skips_known_ids() {
    let source = MemoryStore::with_default_config();
    let h = hypothesis("h1", "Temperature increases enzyme activity");
    source.add_dead_end_memory(&h, "confounded").await;
    source.add_insight_memory("Control for humidity", "review", &[]).await;

    let exported = source.export_memories(None).await;
    let target = MemoryStore::with_default_config();
    assert_eq!(target.import_memories(exported.clone()).await, 2);
    assert_eq!(target.import_memories(exported).await, 0);

    assert_eq!(target.get_dead_ends().await.len(), 1);
    assert_eq!(target.get_insights().await.len(), 1);
}
