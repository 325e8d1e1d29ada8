//! Terminal convergence report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ConvergenceMetrics, StoppingReason};

/// Summary of a finished research session. Produced once, at session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub research_question: String,
    pub converged: bool,
    pub stopping_reason: Option<StoppingReason>,

    pub total_iterations: u32,
    pub total_hypotheses: usize,
    pub hypotheses_supported: usize,
    pub hypotheses_rejected: usize,
    pub experiments_conducted: usize,

    /// Statements of supported hypotheses, in hypothesis order.
    pub supported_hypotheses: Vec<String>,
    /// Statements of rejected hypotheses, in hypothesis order.
    pub rejected_hypotheses: Vec<String>,

    pub final_metrics: ConvergenceMetrics,

    pub research_complete: bool,
    pub recommended_next_steps: Vec<String>,

    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl ConvergenceReport {
    /// Render the report as a Markdown document.
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }
}

/// Displays as the Markdown document.
impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.converged {
            "Research Converged"
        } else {
            "Research Ongoing"
        };
        let reason = self
            .stopping_reason
            .map_or_else(|| "N/A".to_string(), |r| r.to_string());

        writeln!(f, "# Convergence Report\n")?;
        writeln!(f, "**Research Question**: {}\n", self.research_question)?;
        writeln!(f, "**Status**: {status}\n")?;
        writeln!(f, "**Stopping Reason**: {reason}\n")?;

        writeln!(f, "## Summary Statistics\n")?;
        writeln!(f, "- **Total Iterations**: {}", self.total_iterations)?;
        writeln!(f, "- **Hypotheses Generated**: {}", self.total_hypotheses)?;
        writeln!(f, "- **Hypotheses Supported**: {}", self.hypotheses_supported)?;
        writeln!(f, "- **Hypotheses Rejected**: {}", self.hypotheses_rejected)?;
        writeln!(f, "- **Experiments Conducted**: {}\n", self.experiments_conducted)?;

        let m = &self.final_metrics;
        writeln!(f, "## Key Metrics\n")?;
        writeln!(f, "- **Discovery Rate**: {:.2}%", m.discovery_rate * 100.0)?;
        writeln!(f, "- **Novelty Score**: {:.2}", m.novelty_score)?;
        writeln!(f, "- **Saturation**: {:.2}%", m.saturation_ratio * 100.0)?;
        writeln!(f, "- **Consistency**: {:.2}%\n", m.consistency_score * 100.0)?;

        writeln!(f, "## Supported Hypotheses\n")?;
        if self.supported_hypotheses.is_empty() {
            writeln!(f, "None")?;
        }
        for statement in &self.supported_hypotheses {
            writeln!(f, "- {statement}")?;
        }

        writeln!(f, "\n## Recommended Next Steps\n")?;
        for (i, step) in self.recommended_next_steps.iter().enumerate() {
            writeln!(f, "{}. {step}", i + 1)?;
        }

        writeln!(f, "\n## Detailed Summary\n")?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f, "**Generated**: {}", self.generated_at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(supported: Vec<String>) -> ConvergenceReport {
        ConvergenceReport {
            research_question: "Does X cause Y?".to_string(),
            converged: false,
            stopping_reason: None,
            total_iterations: 2,
            total_hypotheses: 3,
            hypotheses_supported: supported.len(),
            hypotheses_rejected: 0,
            experiments_conducted: 2,
            supported_hypotheses: supported,
            rejected_hypotheses: vec![],
            final_metrics: ConvergenceMetrics::default(),
            research_complete: false,
            recommended_next_steps: vec!["Test remaining 1 hypotheses".to_string()],
            summary: "Done.".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_markdown_sections() {
        let md = report(vec![]).to_markdown();

        assert!(md.starts_with("# Convergence Report\n"));
        assert!(md.contains("**Status**: Research Ongoing"));
        assert!(md.contains("**Stopping Reason**: N/A"));
        assert!(md.contains("## Supported Hypotheses\n\nNone\n"));
        assert!(md.contains("1. Test remaining 1 hypotheses"));
        assert!(md.contains("**Generated**: "));
    }

    #[test]
    fn test_markdown_lists_supported_statements() {
        let md = report(vec!["X causes Y".to_string()]).to_markdown();

        assert!(md.contains("- X causes Y\n"));
        assert!(!md.contains("None\n"));
    }
}
