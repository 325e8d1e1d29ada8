//! Domain errors for the Kosmos control plane.
//!
//! Almost nothing in the control plane fails: insufficient data resolves to
//! non-stopping decisions and missing ids are reported in change sets. The
//! variants here cover the few caller mistakes that must not pass silently.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the Kosmos control plane.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Feedback signal already applied: {0}")]
    SignalAlreadyApplied(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
