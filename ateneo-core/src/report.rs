//! Frozen diagnostic reports
//!
//! A report is generated once when a case is submitted and never
//! regenerated. Its critical questions are the material professionals
//! argue against in a debate.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of critical questions every report must carry
pub const REQUIRED_QUESTIONS: usize = 3;

/// The AI collaborator's diagnostic report for a clinical case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiReport {
    /// Primary diagnosis
    pub diagnosis: String,

    /// Clinical justification for the diagnosis
    pub justification: String,

    /// Exactly three critical questions a challenger should address
    pub questions: Vec<String>,
}

impl AiReport {
    pub fn new(
        diagnosis: impl Into<String>,
        justification: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            diagnosis: diagnosis.into(),
            justification: justification.into(),
            questions,
        }
    }

    /// Check the report shape: non-empty diagnosis and justification,
    /// exactly [`REQUIRED_QUESTIONS`] non-empty questions
    pub fn validate(&self) -> Result<()> {
        if self.diagnosis.trim().is_empty() {
            return Err(Error::MalformedReport("empty diagnosis".to_string()));
        }
        if self.justification.trim().is_empty() {
            return Err(Error::MalformedReport("empty justification".to_string()));
        }
        if self.questions.len() != REQUIRED_QUESTIONS {
            return Err(Error::MalformedReport(format!(
                "expected {} questions, got {}",
                REQUIRED_QUESTIONS,
                self.questions.len()
            )));
        }
        if self.questions.iter().any(|q| q.trim().is_empty()) {
            return Err(Error::MalformedReport("empty question".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a report from raw model output
    pub fn parse(raw: &str) -> Result<Self> {
        let report: AiReport = serde_json::from_str(raw)
            .map_err(|e| Error::MalformedReport(format!("invalid JSON: {}", e)))?;
        report.validate()?;
        Ok(report)
    }
}
