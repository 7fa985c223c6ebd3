//! Data models for platform storage

use ateneo_core::AiReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of account a profile represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Uploads anonymized cases for debate
    Volunteer,
    /// Spends credits to claim cases and refute diagnoses
    Professional,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Volunteer => "volunteer",
            ProfileKind::Professional => "professional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "volunteer" => Some(ProfileKind::Volunteer),
            "professional" => Some(ProfileKind::Professional),
            _ => None,
        }
    }
}

/// Unique case identifier (8-character opaque token)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub String);

/// Unique debate identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebateId(pub i64);

/// A registered user
#[derive(Debug, Clone)]
pub struct Profile {
    /// Lowercased email, the primary key
    pub email: String,
    pub kind: ProfileKind,
    pub waiver_signed: bool,
    /// Never decreases through engine operations
    pub ranking: i64,
    /// Never negative
    pub credits: i64,
    pub created_at: DateTime<Utc>,
}

/// An uploaded clinical case with its frozen report
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub id: CaseId,
    pub volunteer_email: String,
    /// Generated once at submit time, never regenerated
    pub report: AiReport,
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

/// A claimed case under debate
#[derive(Debug, Clone)]
pub struct Debate {
    pub id: DebateId,
    pub case_id: CaseId,
    pub professional_email: String,
    pub started_at: DateTime<Utc>,
    pub completed: bool,
}
