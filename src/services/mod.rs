pub mod convergence_detector;
pub mod feedback_loop;
pub mod memory_store;
pub mod research_iteration;

pub use convergence_detector::ConvergenceDetector;
pub use feedback_loop::FeedbackLoop;
pub use memory_store::MemoryStore;
pub use research_iteration::{IterationOutcome, ResearchIteration, ResearchSession};
