//! Ateneo Core Library
//!
//! Shared types for the clinical-case debate platform:
//! - Volunteers upload anonymized cases; the AI collaborator writes a
//!   frozen diagnostic report for each one
//! - Professionals claim cases and submit refutations the AI scores
//! - A report carries a diagnosis, a justification, and exactly three
//!   critical questions

pub mod report;
pub mod oracle;
pub mod error;

pub use report::{AiReport, REQUIRED_QUESTIONS};
pub use oracle::{coerce_score, CaseOracle, MAX_SCORE};
pub use error::Error;

/// Result type for ateneo-core operations
pub type Result<T> = std::result::Result<T, Error>;
