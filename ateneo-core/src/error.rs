//! Error types for the AI collaborator boundary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed report: {0}")]
    MalformedReport(String),

    #[error("Transient AI failure: {0}")]
    Transient(String),

    #[error("Permanent AI failure: {0}")]
    Permanent(String),
}

impl Error {
    /// Whether a retry could reasonably succeed.
    ///
    /// Malformed model output counts as transient: the model is free to
    /// produce a well-formed report on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::MalformedReport(_) | Error::Transient(_))
    }
}
