pub mod config;
pub mod convergence;
pub mod feedback;
pub mod memory;
pub mod research;

pub use config::{Config, ConvergenceConfig, FeedbackConfig, LoggingConfig, MemoryConfig};
pub use convergence::{
    ConvergenceMetrics, ConvergenceReport, CriterionKind, CriterionSlot, StoppingDecision,
    StoppingReason,
};
pub use feedback::{
    ConfidenceAction, ConfidenceChange, FailureCategory, FailurePattern, FeedbackChanges,
    FeedbackSignal, LearningSummary, PatternAction, PatternOutcome, ResultFeedback,
    SignalKind, SignalPayload, SkipReason, SuccessPattern,
};
pub use memory::{
    DuplicateCheck, ExperimentSignature, Memory, MemoryCategory, MemoryQuery, MemoryStatistics,
};
pub use research::{ExperimentProtocol, ExperimentResult, Hypothesis, ResearchPlan, ResultStatus};
