//! Convergence domain models.

pub mod decision;
pub mod metrics;
pub mod report;

pub use decision::*;
pub use metrics::*;
pub use report::*;
