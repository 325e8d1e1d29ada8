//! Categorized research memory with experiment deduplication.
//!
//! Memories live in five disjoint categories, each capped at an even share of
//! `max_memories`. When a category overflows it is pruned: a memory survives
//! if it is important, recent, or has been retrieved at least once.
//!
//! Experiment signatures are exact content hashes, so paraphrased hypotheses
//! are not recognized as duplicates.

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::memory::prune_cutoff;
use crate::domain::models::{
    DuplicateCheck, ExperimentProtocol, ExperimentResult, ExperimentSignature, Hypothesis, Memory,
    MemoryCategory, MemoryConfig, MemoryQuery, MemoryStatistics,
};

/// Characters of a hypothesis statement embedded in memory content.
const STATEMENT_PREVIEW_CHARS: usize = 100;
/// Shared words needed for a memory to count as a similar hypothesis.
const MIN_KEYWORD_OVERLAP: usize = 3;
const MAX_SIMILAR_RESULTS: usize = 5;
/// Hex characters kept for memory ids and partial signature hashes.
const SHORT_HASH_LEN: usize = 16;
const NO_PROTOCOL: &str = "none";

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn short_hash(input: &str) -> String {
    let mut hash = sha256_hex(input);
    hash.truncate(SHORT_HASH_LEN);
    hash
}

fn preview(statement: &str) -> String {
    statement.chars().take(STATEMENT_PREVIEW_CHARS).collect()
}

fn format_stat(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

fn keywords(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Hashes identifying a (hypothesis, protocol) pair.
struct SignatureHashes {
    hypothesis: String,
    protocol: String,
    combined: String,
}

impl SignatureHashes {
    fn compute(hypothesis: &Hypothesis, protocol: Option<&ExperimentProtocol>) -> Self {
        let hypothesis_hash = short_hash(&hypothesis.statement);
        let protocol_hash = protocol.map_or_else(
            || NO_PROTOCOL.to_string(),
            |p| short_hash(&format!("{}:{}", p.experiment_type, p.methodology)),
        );
        let combined = sha256_hex(&format!("{hypothesis_hash}:{protocol_hash}"));
        Self {
            hypothesis: hypothesis_hash,
            protocol: protocol_hash,
            combined,
        }
    }
}

/// Internal state for the memory store.
#[derive(Debug)]
struct MemoryState {
    memories: BTreeMap<MemoryCategory, Vec<Memory>>,
    signatures: HashMap<String, ExperimentSignature>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            memories: MemoryCategory::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
            signatures: HashMap::new(),
        }
    }
}

impl MemoryState {
    fn all(&self) -> impl Iterator<Item = &Memory> {
        self.memories.values().flatten()
    }
}

/// Memory store service.
pub struct MemoryStore {
    config: MemoryConfig,
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        tracing::info!(
            max_memories = config.max_memories,
            prune_after_days = config.prune_after_days,
            "MemoryStore initialized"
        );
        Self {
            config,
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Capacity of a single category.
    pub fn category_capacity(&self) -> usize {
        self.config.max_memories / MemoryCategory::ALL.len()
    }

    /// Store a memory and return its id.
    pub async fn add_memory(
        &self,
        category: MemoryCategory,
        content: impl Into<String>,
        data: HashMap<String, serde_json::Value>,
        importance: f64,
        tags: Vec<String>,
    ) -> String {
        let content = content.into();
        let now = Utc::now();
        let id = short_hash(&format!("{category}:{content}:{}", now.to_rfc3339()));

        tracing::debug!(%category, %id, "Adding memory");

        let memory = Memory::new(id.clone(), category, content, importance)
            .with_data(data)
            .with_tags(tags)
            .with_created_at(now);

        let mut state = self.state.write().await;
        let len = {
            let bucket = state.memories.entry(category).or_default();
            bucket.push(memory);
            bucket.len()
        };
        if len > self.category_capacity() {
            self.prune_locked(&mut state, category);
        }

        id
    }

    /// Remember a supported result.
    pub async fn add_success_memory(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
        insights: Option<&str>,
    ) -> String {
        let content = format!(
            "Success: {} (p={}, effect={})",
            preview(&hypothesis.statement),
            format_stat(result.primary_p_value, 4),
            format_stat(result.primary_effect_size, 2),
        );
        let data = HashMap::from([
            ("result_id".to_string(), json!(result.id)),
            ("hypothesis_id".to_string(), json!(hypothesis.id)),
            ("p_value".to_string(), json!(result.primary_p_value)),
            ("effect_size".to_string(), json!(result.primary_effect_size)),
            ("test_type".to_string(), json!(result.primary_test)),
            ("insights".to_string(), json!(insights)),
        ]);
        let tags = vec![
            "success".to_string(),
            hypothesis.domain.clone(),
            result.primary_test.clone(),
        ];

        let category = MemoryCategory::SuccessPatterns;
        self.add_memory(category, content, data, category.default_importance(), tags)
            .await
    }

    /// Remember a failed result and why it failed.
    pub async fn add_failure_memory(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
        failure_reason: &str,
    ) -> String {
        let content = format!(
            "Failure: {} - {failure_reason}",
            preview(&hypothesis.statement)
        );
        let data = HashMap::from([
            ("result_id".to_string(), json!(result.id)),
            ("hypothesis_id".to_string(), json!(hypothesis.id)),
            ("failure_reason".to_string(), json!(failure_reason)),
            ("test_type".to_string(), json!(result.primary_test)),
        ]);
        let tags = vec![
            "failure".to_string(),
            hypothesis.domain.clone(),
            failure_reason.to_string(),
        ];

        let category = MemoryCategory::FailurePatterns;
        self.add_memory(category, content, data, category.default_importance(), tags)
            .await
    }

    /// Remember a hypothesis that should not be pursued again.
    pub async fn add_dead_end_memory(&self, hypothesis: &Hypothesis, reason: &str) -> String {
        let content = format!("Dead end: {} - {reason}", preview(&hypothesis.statement));
        let data = HashMap::from([
            ("hypothesis_id".to_string(), json!(hypothesis.id)),
            ("reason".to_string(), json!(reason)),
        ]);
        let tags = vec!["dead_end".to_string(), hypothesis.domain.clone()];

        let category = MemoryCategory::DeadEnds;
        self.add_memory(category, content, data, category.default_importance(), tags)
            .await
    }

    /// Remember a key insight.
    pub async fn add_insight_memory(
        &self,
        insight: &str,
        source: &str,
        related_hypotheses: &[String],
    ) -> String {
        let data = HashMap::from([
            ("source".to_string(), json!(source)),
            ("related_hypotheses".to_string(), json!(related_hypotheses)),
        ]);

        let category = MemoryCategory::Insights;
        self.add_memory(
            category,
            insight,
            data,
            category.default_importance(),
            vec!["insight".to_string()],
        )
        .await
    }

    /// Retrieve memories ranked by importance discounted by age.
    ///
    /// Every returned memory has an access recorded, and the copies reflect it.
    pub async fn query_memory(&self, query: &MemoryQuery) -> Vec<Memory> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let mut ranked: Vec<(MemoryCategory, usize, f64)> = state
            .memories
            .iter()
            .filter(|(category, _)| query.category.is_none() || query.category == Some(**category))
            .flat_map(|(category, memories)| {
                memories
                    .iter()
                    .enumerate()
                    .map(move |(index, memory)| (*category, index, memory))
            })
            .filter(|(_, _, m)| m.importance >= query.min_importance)
            .filter(|(_, _, m)| query.tags.is_empty() || m.has_any_tag(&query.tags))
            .map(|(category, index, m)| (category, index, m.recency_score(now)))
            .collect();

        ranked.sort_by(|a, b| b.2.total_cmp(&a.2));
        ranked.truncate(query.limit);

        let mut found = Vec::with_capacity(ranked.len());
        for (category, index, _) in ranked {
            if let Some(memory) = state
                .memories
                .get_mut(&category)
                .and_then(|memories| memories.get_mut(index))
            {
                memory.record_access();
                found.push(memory.clone());
            }
        }

        tracing::debug!(returned = found.len(), "Memory query");
        found
    }

    /// Find success, failure and dead-end memories sharing words with a hypothesis.
    pub async fn search_similar_hypothesis(&self, hypothesis: &Hypothesis) -> Vec<Memory> {
        let wanted = keywords(&hypothesis.statement);
        let state = self.state.read().await;

        let mut similar: Vec<Memory> = [
            MemoryCategory::SuccessPatterns,
            MemoryCategory::FailurePatterns,
            MemoryCategory::DeadEnds,
        ]
        .iter()
        .filter_map(|category| state.memories.get(category))
        .flatten()
        .filter(|memory| keywords(&memory.content).intersection(&wanted).count() >= MIN_KEYWORD_OVERLAP)
        .cloned()
        .collect();

        similar.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        similar.truncate(MAX_SIMILAR_RESULTS);
        similar
    }

    pub async fn get_dead_ends(&self) -> Vec<Memory> {
        self.export_memories(Some(MemoryCategory::DeadEnds)).await
    }

    pub async fn get_insights(&self) -> Vec<Memory> {
        self.export_memories(Some(MemoryCategory::Insights)).await
    }

    /// Record that an experiment was run; returns the combined signature hash.
    ///
    /// The first recording of a signature wins; later ones leave it untouched.
    pub async fn record_experiment(
        &self,
        hypothesis: &Hypothesis,
        protocol: Option<&ExperimentProtocol>,
    ) -> String {
        let hashes = SignatureHashes::compute(hypothesis, protocol);
        let mut state = self.state.write().await;

        state
            .signatures
            .entry(hashes.combined.clone())
            .or_insert_with(|| ExperimentSignature {
                hypothesis_hash: hashes.hypothesis,
                protocol_hash: hashes.protocol,
                combined_hash: hashes.combined.clone(),
                hypothesis_id: Some(hypothesis.id.clone()),
                protocol_id: protocol.and_then(|p| p.id.clone()),
                created_at: Utc::now(),
            });

        tracing::debug!(signature = %hashes.combined, "Recorded experiment signature");
        hashes.combined
    }

    /// Check whether an experiment, or its hypothesis, has been run before.
    pub async fn is_duplicate_experiment(
        &self,
        hypothesis: &Hypothesis,
        protocol: Option<&ExperimentProtocol>,
    ) -> DuplicateCheck {
        let hashes = SignatureHashes::compute(hypothesis, protocol);
        let state = self.state.read().await;

        if state.signatures.contains_key(&hashes.combined) {
            return DuplicateCheck::ExactDuplicate;
        }

        let times = state
            .signatures
            .values()
            .filter(|sig| sig.hypothesis_hash == hashes.hypothesis)
            .count();

        if times > 0 {
            DuplicateCheck::SimilarHypothesis { times }
        } else {
            DuplicateCheck::Unique
        }
    }

    /// Drop stale memories from one category; returns how many were removed.
    pub async fn prune_category(&self, category: MemoryCategory) -> usize {
        let mut state = self.state.write().await;
        self.prune_locked(&mut state, category)
    }

    /// Prune every category; returns how many memories were removed.
    pub async fn prune_old_memories(&self) -> usize {
        let mut state = self.state.write().await;
        MemoryCategory::ALL
            .into_iter()
            .map(|category| self.prune_locked(&mut state, category))
            .sum()
    }

    pub async fn get_memory_statistics(&self) -> MemoryStatistics {
        let state = self.state.read().await;

        MemoryStatistics {
            total_memories: state.memories.values().map(Vec::len).sum(),
            by_category: state
                .memories
                .iter()
                .map(|(category, memories)| (*category, memories.len()))
                .collect(),
            experiment_signatures: state.signatures.len(),
            most_accessed: first_max(state.all(), |m| f64::from(m.access_count)),
            highest_importance: first_max(state.all(), |m| m.importance),
        }
    }

    /// Copies of stored memories, one category or all of them.
    pub async fn export_memories(&self, category: Option<MemoryCategory>) -> Vec<Memory> {
        let state = self.state.read().await;
        match category {
            Some(category) => state.memories.get(&category).cloned().unwrap_or_default(),
            None => state.all().cloned().collect(),
        }
    }

    /// Restore exported memories; returns how many were added.
    pub async fn import_memories(&self, memories: Vec<Memory>) -> usize {
        let mut state = self.state.write().await;
        let mut touched = HashSet::new();
        let mut imported = 0;

        for memory in memories {
            let bucket = state.memories.entry(memory.category).or_default();
            if bucket.iter().any(|m| m.id == memory.id) {
                tracing::debug!(id = %memory.id, "Skipping already stored memory");
                continue;
            }
            touched.insert(memory.category);
            bucket.push(memory);
            imported += 1;
        }

        let capacity = self.category_capacity();
        for category in touched {
            let over = state
                .memories
                .get(&category)
                .is_some_and(|memories| memories.len() > capacity);
            if over {
                self.prune_locked(&mut state, category);
            }
        }

        tracing::info!(imported, "Imported memories");
        imported
    }

    fn prune_locked(&self, state: &mut MemoryState, category: MemoryCategory) -> usize {
        let cutoff = prune_cutoff(Utc::now(), self.config.prune_after_days);
        let floor = self.config.min_importance_to_keep;

        let Some(memories) = state.memories.get_mut(&category) else {
            return 0;
        };
        let before = memories.len();
        memories.retain(|memory| memory.is_retained(floor, cutoff));
        let pruned = before - memories.len();

        if pruned > 0 {
            tracing::info!(%category, pruned, "Pruned memories");
        }
        pruned
    }
}

/// Content of the first memory with the largest key.
fn first_max<'a>(
    memories: impl Iterator<Item = &'a Memory>,
    key: impl Fn(&Memory) -> f64,
) -> Option<String> {
    let mut best: Option<(&Memory, f64)> = None;
    for memory in memories {
        let value = key(memory);
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((memory, value)),
        }
    }
    best.map(|(memory, _)| memory.content.clone())
}
