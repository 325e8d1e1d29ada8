//! Replay CLI command implementation.
//!
//! Feeds a recorded session (plan, hypotheses, results in order) through a
//! fresh control plane and prints what each iteration decided.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{
    Config, ConvergenceReport, ExperimentProtocol, ExperimentResult, Hypothesis,
    LearningSummary, MemoryStatistics, PatternOutcome, ResearchPlan,
};
use crate::services::{IterationOutcome, ResearchIteration, ResearchSession};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Session snapshot (JSON)
    pub session: PathBuf,

    /// Keep feeding results after a stopping decision
    #[arg(long)]
    pub no_stop: bool,
}

/// A recorded research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub plan: ResearchPlan,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    /// Results in the order they were produced.
    #[serde(default)]
    pub results: Vec<ExperimentResult>,
    /// Protocol used per hypothesis id.
    #[serde(default)]
    pub protocols: HashMap<String, ExperimentProtocol>,
    #[serde(default)]
    pub strategy_weights: HashMap<String, f64>,
}

impl SessionSnapshot {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse session {}", path.display()))
    }
}

#[derive(Debug, Serialize)]
pub struct IterationRow {
    pub iteration: u32,
    pub result_id: String,
    pub hypothesis_id: String,
    pub duplicate: Option<String>,
    pub pattern: String,
    pub signals_applied: usize,
    pub should_stop: bool,
    pub reason: String,
    pub confidence: f64,
    pub details: String,
}

impl From<&IterationOutcome> for IterationRow {
    fn from(outcome: &IterationOutcome) -> Self {
        Self {
            iteration: outcome.iteration,
            result_id: outcome.result_id.clone(),
            hypothesis_id: outcome.hypothesis_id.clone(),
            duplicate: outcome.duplicate.reason(),
            pattern: describe_pattern(outcome.pattern.as_ref()),
            signals_applied: outcome.signals_applied,
            should_stop: outcome.decision.should_stop,
            reason: outcome.decision.reason.to_string(),
            confidence: outcome.decision.confidence,
            details: outcome.decision.details.clone(),
        }
    }
}

fn describe_pattern(pattern: Option<&PatternOutcome>) -> String {
    match pattern {
        None => "unknown hypothesis".to_string(),
        Some(PatternOutcome::SuccessLearned { pattern_id, merged })
        | Some(PatternOutcome::FailureLearned {
            pattern_id, merged, ..
        }) => {
            if *merged {
                format!("merged {pattern_id}")
            } else {
                format!("learned {pattern_id}")
            }
        }
        Some(PatternOutcome::Skipped { reason }) => format!("skipped ({reason})"),
        Some(PatternOutcome::NotApplicable) => "-".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub iterations: Vec<IterationRow>,
    /// Results left unprocessed after the loop stopped.
    pub unprocessed: usize,
    pub learning: LearningSummary,
    pub memory: MemoryStatistics,
    pub report: ConvergenceReport,
}

impl CommandOutput for ReplayOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["#", "Result", "Hypothesis", "Pattern", "Stop", "Reason"]);
        for row in &self.iterations {
            let reason = match &row.duplicate {
                Some(dup) => format!("{} [{}]", row.reason, truncate(dup, 30)),
                None => row.reason.clone(),
            };
            table.add_row(vec![
                row.iteration.to_string(),
                truncate(&row.result_id, 16),
                truncate(&row.hypothesis_id, 16),
                truncate(&row.pattern, 32),
                if row.should_stop { "yes" } else { "no" }.to_string(),
                reason,
            ]);
        }

        let mut lines = vec![
            format!("Replayed {} result(s):", self.iterations.len()),
            String::new(),
            table.to_string(),
            String::new(),
        ];
        if self.unprocessed > 0 {
            lines.push(format!(
                "{} result(s) not processed after stopping.",
                self.unprocessed
            ));
            lines.push(String::new());
        }

        lines.push("Learning:".to_string());
        lines.push(format!(
            "  Patterns: {} success, {} failure",
            self.learning.success_patterns_learned, self.learning.failure_patterns_learned
        ));
        lines.push(format!(
            "  Signals:  {} applied, {} pending",
            self.learning.applied_signals, self.learning.pending_signals
        ));
        if let Some(ref id) = self.learning.most_common_success {
            lines.push(format!("  Most common success: {id}"));
        }
        if let Some(ref id) = self.learning.most_common_failure {
            lines.push(format!("  Most common failure: {id}"));
        }
        lines.push(String::new());

        lines.push("Memory:".to_string());
        lines.push(format!(
            "  {} memories, {} experiment signature(s)",
            self.memory.total_memories, self.memory.experiment_signatures
        ));
        for (category, count) in &self.memory.by_category {
            lines.push(format!("    {:<16} {count}", category.as_str()));
        }
        lines.push(String::new());

        lines.push(self.report.to_markdown());
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ReplayArgs, config: &Config, json_mode: bool) -> Result<()> {
    let snapshot = SessionSnapshot::from_file(&args.session)?;
    let driver = ResearchIteration::from_config(config);

    let total = snapshot.results.len();
    let mut session = ResearchSession::new(snapshot.plan, snapshot.hypotheses);
    session.strategy_weights = snapshot.strategy_weights;

    tracing::info!(
        session = %args.session.display(),
        results = total,
        "replaying research session"
    );

    let mut iterations = Vec::with_capacity(total);
    for result in snapshot.results {
        if session.has_converged() && !args.no_stop {
            break;
        }
        let protocol = snapshot.protocols.get(&result.hypothesis_id);
        let outcome = driver.run(&mut session, result, protocol).await?;
        iterations.push(IterationRow::from(&outcome));
    }

    let report = driver.finish(&session).await;
    let learning = driver.feedback().get_learning_summary().await;
    let memory = driver.memory().get_memory_statistics().await;

    let out = ReplayOutput {
        unprocessed: total - iterations.len(),
        iterations,
        learning,
        memory,
        report,
    };
    output(&out, json_mode);
    Ok(())
}
