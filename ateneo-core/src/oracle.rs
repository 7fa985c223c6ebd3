//! AI collaborator interface
//!
//! The oracle generates the frozen report at submit time and scores
//! refutations during a debate. Implementations decide transport; this
//! trait only fixes the semantics:
//! - reports must satisfy [`AiReport::validate`](crate::AiReport::validate)
//! - scores are integers in `[0, MAX_SCORE]`, anything else coerces to 0

use async_trait::async_trait;

use crate::{AiReport, Result};

/// Upper bound of the refutation score scale
pub const MAX_SCORE: u8 = 100;

/// Trait for the AI collaborator
///
/// This allows different implementations:
/// - Gemini-backed client (production)
/// - Scriptable stub (testing)
#[async_trait]
pub trait CaseOracle: Send + Sync {
    /// Generate the diagnostic report for an uploaded case
    async fn generate_report(&self, case_text: &str) -> Result<AiReport>;

    /// Score a refutation against the case's frozen report
    async fn score_refutation(&self, report: &AiReport, refutation: &str) -> Result<u8>;
}

/// Allow using Box<dyn CaseOracle> as a CaseOracle
#[async_trait]
impl CaseOracle for Box<dyn CaseOracle> {
    async fn generate_report(&self, case_text: &str) -> Result<AiReport> {
        (**self).generate_report(case_text).await
    }

    async fn score_refutation(&self, report: &AiReport, refutation: &str) -> Result<u8> {
        (**self).score_refutation(report, refutation).await
    }
}

/// Allow sharing one oracle behind an Arc
#[async_trait]
impl<T: CaseOracle + ?Sized> CaseOracle for std::sync::Arc<T> {
    async fn generate_report(&self, case_text: &str) -> Result<AiReport> {
        (**self).generate_report(case_text).await
    }

    async fn score_refutation(&self, report: &AiReport, refutation: &str) -> Result<u8> {
        (**self).score_refutation(report, refutation).await
    }
}

/// Coerce a raw model score into the valid range
///
/// Non-integer and out-of-range values become 0, not the nearest bound.
pub fn coerce_score(raw: Option<i64>) -> u8 {
    match raw {
        Some(score) if (0..=MAX_SCORE as i64).contains(&score) => score as u8,
        _ => 0,
    }
}
