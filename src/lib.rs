//! Kosmos - research loop control plane
//!
//! Kosmos decides when an autonomous research loop should stop, learns from
//! experiment outcomes, and remembers what has been tried so experiments are
//! not repeated.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): research entities, decisions, patterns, memories
//! - **Service Layer** (`services`): convergence detection, feedback learning,
//!   memory, and the per-iteration driver that wires them together
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use kosmos::{Config, ResearchIteration, ResearchSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = ResearchIteration::from_config(&Config::default());
//!     let mut session = ResearchSession::new(plan, hypotheses);
//!     let outcome = driver.run(&mut session, result, None).await?;
//!     if outcome.decision.should_stop {
//!         println!("{}", driver.finish(&session).await.to_markdown());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, ConvergenceConfig, ConvergenceMetrics, ConvergenceReport, ExperimentProtocol,
    ExperimentResult, FeedbackConfig, FeedbackSignal, Hypothesis, LoggingConfig, Memory,
    MemoryCategory, MemoryConfig, ResearchPlan, ResultStatus, StoppingDecision, StoppingReason,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ConvergenceDetector, FeedbackLoop, IterationOutcome, MemoryStore, ResearchIteration,
    ResearchSession,
};
