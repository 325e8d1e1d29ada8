//! Research entities produced by external collaborators.
//!
//! Hypotheses, experiment results, protocols and the research plan are
//! generated elsewhere (language-model agents, experiment runners, the plan
//! tracker). The control plane only reads them, with one exception: applying
//! a hypothesis-update signal writes `Hypothesis::confidence_score`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A candidate explanation under investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub statement: String,
    #[serde(default)]
    pub domain: String,
    /// How unexplored the hypothesis is (0.0-1.0), if scored.
    #[serde(default)]
    pub novelty_score: Option<f64>,
    /// How amenable the hypothesis is to experiment (0.0-1.0), if scored.
    #[serde(default)]
    pub testability_score: Option<f64>,
    /// Current belief in the hypothesis (0.0-1.0), if scored.
    #[serde(default)]
    pub confidence_score: Option<f64>,
    /// Creation time; defines creation order for novelty tracking.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Hypothesis {
    /// Create an unscored hypothesis.
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            domain: domain.into(),
            novelty_score: None,
            testability_score: None,
            confidence_score: None,
            created_at: Utc::now(),
        }
    }

    /// Set the novelty score.
    pub fn with_novelty(mut self, novelty: f64) -> Self {
        self.novelty_score = Some(novelty);
        self
    }

    /// Set the testability score.
    pub fn with_testability(mut self, testability: f64) -> Self {
        self.testability_score = Some(testability);
        self
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = Some(confidence);
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Execution status reported by the experiment runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The experiment ran to completion.
    Success,
    /// The experiment could not be executed.
    Failure,
    /// The experiment ran but produced incomplete output.
    Partial,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Partial => "partial",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub id: String,
    #[serde(default)]
    pub hypothesis_id: String,
    pub status: ResultStatus,
    /// `Some(true)` supported, `Some(false)` refuted, `None` inconclusive.
    #[serde(default)]
    pub supports_hypothesis: Option<bool>,
    /// Name of the primary statistical test (e.g. `t_test`).
    #[serde(default)]
    pub primary_test: String,
    #[serde(default)]
    pub primary_p_value: Option<f64>,
    #[serde(default)]
    pub primary_effect_size: Option<f64>,
    /// Monetary cost of running the experiment.
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub sample_size: Option<u64>,
}

impl ExperimentResult {
    /// Create a result with no statistics attached.
    pub fn new(
        id: impl Into<String>,
        hypothesis_id: impl Into<String>,
        status: ResultStatus,
        supports_hypothesis: Option<bool>,
    ) -> Self {
        Self {
            id: id.into(),
            hypothesis_id: hypothesis_id.into(),
            status,
            supports_hypothesis,
            primary_test: String::new(),
            primary_p_value: None,
            primary_effect_size: None,
            cost: None,
            sample_size: None,
        }
    }

    /// Attach the primary test and its statistics.
    pub fn with_test(
        mut self,
        test: impl Into<String>,
        p_value: Option<f64>,
        effect_size: Option<f64>,
    ) -> Self {
        self.primary_test = test.into();
        self.primary_p_value = p_value;
        self.primary_effect_size = effect_size;
        self
    }

    /// Attach the experiment cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Attach the sample size.
    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    /// True when the result explicitly supports its hypothesis.
    pub fn is_significant(&self) -> bool {
        self.supports_hypothesis == Some(true)
    }
}

/// Experiment design, consumed only for deduplication signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentProtocol {
    #[serde(default)]
    pub id: Option<String>,
    pub experiment_type: String,
    #[serde(default)]
    pub methodology: String,
}

impl ExperimentProtocol {
    pub fn new(experiment_type: impl Into<String>, methodology: impl Into<String>) -> Self {
        Self {
            id: None,
            experiment_type: experiment_type.into(),
            methodology: methodology.into(),
        }
    }

    /// Set the protocol id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Research plan state tracked by the orchestrator.
///
/// Pool membership is owned by the plan. The control plane reads the sets
/// and never recomputes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    #[serde(default)]
    pub research_question: String,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// All hypothesis ids, in the order they entered the plan.
    #[serde(default)]
    pub hypothesis_pool: Vec<String>,
    #[serde(default)]
    pub tested_hypotheses: HashSet<String>,
    #[serde(default)]
    pub supported_hypotheses: HashSet<String>,
    #[serde(default)]
    pub rejected_hypotheses: HashSet<String>,
    /// Protocol ids waiting to run.
    #[serde(default)]
    pub experiment_queue: Vec<String>,
    #[serde(default)]
    pub has_converged: bool,
}

const fn default_max_iterations() -> u32 {
    10
}

impl ResearchPlan {
    pub fn new(research_question: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            research_question: research_question.into(),
            max_iterations,
            ..Default::default()
        }
    }

    /// Hypothesis ids in the pool that have not been tested, in pool order.
    pub fn untested_hypotheses(&self) -> Vec<&str> {
        self.hypothesis_pool
            .iter()
            .filter(|id| !self.tested_hypotheses.contains(*id))
            .map(String::as_str)
            .collect()
    }

    /// Tested / pool size, clamped to `[0, 1]`; 0.0 for an empty pool.
    pub fn testability_rate(&self) -> f64 {
        if self.hypothesis_pool.is_empty() {
            return 0.0;
        }
        (self.tested_hypotheses.len() as f64 / self.hypothesis_pool.len() as f64).clamp(0.0, 1.0)
    }

    /// Add a hypothesis id to the pool (idempotent).
    pub fn add_hypothesis(&mut self, hypothesis_id: impl Into<String>) {
        let id = hypothesis_id.into();
        if !self.hypothesis_pool.contains(&id) {
            self.hypothesis_pool.push(id);
        }
    }

    /// Mark a hypothesis tested and file it as supported or rejected.
    ///
    /// `None` leaves it tested but in neither outcome set.
    pub fn mark_tested(&mut self, hypothesis_id: &str, supported: Option<bool>) {
        self.tested_hypotheses.insert(hypothesis_id.to_string());
        match supported {
            Some(true) => {
                self.rejected_hypotheses.remove(hypothesis_id);
                self.supported_hypotheses.insert(hypothesis_id.to_string());
            }
            Some(false) => {
                self.supported_hypotheses.remove(hypothesis_id);
                self.rejected_hypotheses.insert(hypothesis_id.to_string());
            }
            None => {}
        }
    }
}
