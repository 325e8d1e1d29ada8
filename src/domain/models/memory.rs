//! Memory domain model.
//!
//! Research memory is partitioned into five disjoint categories:
//! - Success patterns: what worked
//! - Failure patterns: what did not
//! - Dead ends: hypotheses and approaches to avoid
//! - Insights: key discoveries
//! - General: everything else

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Memory category. Every stored memory belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    SuccessPatterns,
    FailurePatterns,
    DeadEnds,
    Insights,
    General,
}

impl MemoryCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::SuccessPatterns,
        Self::FailurePatterns,
        Self::DeadEnds,
        Self::Insights,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuccessPatterns => "success_patterns",
            Self::FailurePatterns => "failure_patterns",
            Self::DeadEnds => "dead_ends",
            Self::Insights => "insights",
            Self::General => "general",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success_patterns" | "success" => Some(Self::SuccessPatterns),
            "failure_patterns" | "failure" => Some(Self::FailurePatterns),
            "dead_ends" | "dead_end" => Some(Self::DeadEnds),
            "insights" | "insight" => Some(Self::Insights),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Default importance for memories created by the category constructors.
    pub fn default_importance(&self) -> f64 {
        match self {
            Self::SuccessPatterns => 0.8,
            Self::FailurePatterns => 0.7,
            Self::DeadEnds => 0.9,
            Self::Insights => 0.95,
            Self::General => 0.5,
        }
    }
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A memory entry in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Short content hash
    pub id: String,
    pub category: MemoryCategory,
    pub content: String,
    /// Associated structured data
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// Importance score (0.0-1.0)
    pub importance: f64,
    /// Number of times returned by a query
    #[serde(default)]
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Memory {
    /// Create a memory; importance is clamped to `[0, 1]`.
    pub fn new(
        id: impl Into<String>,
        category: MemoryCategory,
        content: impl Into<String>,
        importance: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            category,
            content: content.into(),
            data: HashMap::new(),
            importance: clamp_importance(importance),
            access_count: 0,
            created_at: now,
            last_accessed: now,
            tags: Vec::new(),
        }
    }

    /// Set associated data.
    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Backdate creation (and last access) to `created_at`.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.last_accessed = created_at;
        self
    }

    /// Record an access (updates access count and last_accessed).
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Whole days elapsed since creation, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Query ranking score: `importance / (1 + whole days since creation)`.
    ///
    /// Discontinuous at day boundaries and not decay-calibrated; kept exactly
    /// for compatibility with stored rankings.
    pub fn recency_score(&self, now: DateTime<Utc>) -> f64 {
        self.importance / (self.age_days(now) + 1) as f64
    }

    /// True if the memory survives pruning under the given policy.
    pub fn is_retained(&self, min_importance: f64, cutoff: DateTime<Utc>) -> bool {
        self.importance >= min_importance || self.created_at > cutoff || self.access_count > 0
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

fn clamp_importance(importance: f64) -> f64 {
    if importance.is_nan() {
        0.0
    } else {
        importance.clamp(0.0, 1.0)
    }
}

/// Filter for `MemoryStore::query_memory`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQuery {
    /// Restrict to one category; all categories when `None`.
    pub category: Option<MemoryCategory>,
    /// Match memories carrying any of these tags; no tag filter when empty.
    pub tags: Vec<String>,
    pub min_importance: f64,
    pub limit: usize,
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            category: None,
            tags: Vec::new(),
            min_importance: 0.0,
            limit: 10,
        }
    }
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: MemoryCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = min_importance;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Identity of a (hypothesis, protocol) pair for duplicate detection.
///
/// Inserted once, keyed by `combined_hash`, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSignature {
    pub hypothesis_hash: String,
    /// `"none"` when the experiment was recorded without a protocol.
    pub protocol_hash: String,
    pub combined_hash: String,
    pub hypothesis_id: Option<String>,
    pub protocol_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a duplicate-experiment check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum DuplicateCheck {
    /// Same hypothesis and same protocol already recorded.
    ExactDuplicate,
    /// Same hypothesis statement recorded with other protocols.
    SimilarHypothesis { times: usize },
    Unique,
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Self::Unique)
    }

    /// Human-readable explanation, `None` for unique experiments.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::ExactDuplicate => {
                Some("Exact duplicate (same hypothesis + same protocol)".to_string())
            }
            Self::SimilarHypothesis { times } => {
                Some(format!("Similar hypothesis tested {times} time(s)"))
            }
            Self::Unique => None,
        }
    }

    /// `(is_duplicate, reason)` pair.
    pub fn as_tuple(&self) -> (bool, Option<String>) {
        (self.is_duplicate(), self.reason())
    }
}

/// Memory store statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub total_memories: usize,
    pub by_category: std::collections::BTreeMap<MemoryCategory, usize>,
    pub experiment_signatures: usize,
    /// Content of the most accessed memory.
    pub most_accessed: Option<String>,
    /// Content of the most important memory.
    pub highest_importance: Option<String>,
}

/// Days-old cutoff helper used by pruning.
pub fn prune_cutoff(now: DateTime<Utc>, prune_after_days: i64) -> DateTime<Utc> {
    now - Duration::days(prune_after_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!(MemoryCategory::from_str("dead_end"), Some(MemoryCategory::DeadEnds));
        assert_eq!(MemoryCategory::from_str("INSIGHTS"), Some(MemoryCategory::Insights));
        assert_eq!(MemoryCategory::from_str("bogus"), None);
    }

    #[test]
    fn test_recency_score_uses_whole_days() {
        let now = Utc::now();
        let fresh = Memory::new("a", MemoryCategory::General, "x", 0.6);
        let old = Memory::new("b", MemoryCategory::General, "y", 0.6)
            .with_created_at(now - Duration::hours(36));

        assert!((fresh.recency_score(now) - 0.6).abs() < 1e-9);
        // 36 hours is one whole day: 0.6 / 2.
        assert!((old.recency_score(now) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_importance_clamped() {
        assert!((Memory::new("a", MemoryCategory::General, "x", 1.5).importance - 1.0).abs() < f64::EPSILON);
        assert!(Memory::new("a", MemoryCategory::General, "x", f64::NAN).importance.abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_reasons() {
        assert_eq!(DuplicateCheck::Unique.as_tuple(), (false, None));
        assert_eq!(
            DuplicateCheck::SimilarHypothesis { times: 2 }.reason().as_deref(),
            Some("Similar hypothesis tested 2 time(s)")
        );
        assert!(DuplicateCheck::ExactDuplicate
            .reason()
            .is_some_and(|r| r.starts_with("Exact duplicate")));
    }
}
