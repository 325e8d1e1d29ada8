//! Domain layer for the Kosmos research control plane
//!
//! This module contains the data model consumed and owned by the control plane.

pub mod errors;
pub mod models;

pub use errors::{DomainError, DomainResult};
