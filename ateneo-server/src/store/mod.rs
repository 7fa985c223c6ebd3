//! Storage abstractions for the platform

pub mod models;

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryCaseStore, InMemoryDebateStore, InMemoryProfileStore};
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use ateneo_core::AiReport;
use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for profile storage
///
/// Every operation lowercases the email before touching storage.
pub trait ProfileStore: Send + Sync {
    /// Create a profile with zero credits and ranking
    fn create(&self, email: &str, kind: ProfileKind) -> StoreResult<Profile>;

    /// Get a profile by email
    fn get(&self, email: &str) -> StoreResult<Option<Profile>>;

    /// Record waiver acceptance (idempotent)
    fn mark_waiver(&self, email: &str) -> StoreResult<()>;

    /// Read the current credit balance
    fn get_credits(&self, email: &str) -> StoreResult<i64>;

    /// Read the current ranking
    fn get_ranking(&self, email: &str) -> StoreResult<i64>;
}

/// Trait for balance and ranking mutations
///
/// The sole mutators of credits and ranking. Both refuse results below
/// zero via a conditional update, and neither holds a lock across a
/// suspension point (no method suspends).
pub trait CreditLedger: Send + Sync {
    /// Apply a delta to the credit balance, returning the new balance
    fn add_credits(&self, email: &str, delta: i64) -> StoreResult<i64>;

    /// Apply a delta to the ranking, returning the new ranking
    fn adjust_ranking(&self, email: &str, delta: i64) -> StoreResult<i64>;
}

/// Trait for case storage
pub trait CaseStore: Send + Sync {
    /// Insert a new case
    fn insert(&self, case: &CaseRecord) -> StoreResult<()>;

    /// List available cases, newest first
    fn list_available(&self) -> StoreResult<Vec<CaseRecord>>;

    /// Get a case by id
    fn get(&self, case_id: &CaseId) -> StoreResult<Option<CaseRecord>>;

    /// Get a case's frozen report
    fn get_report(&self, case_id: &CaseId) -> StoreResult<Option<AiReport>>;

    /// The atomic claim primitive: flips available true -> false.
    /// Returns false when the case is unknown or already claimed.
    fn mark_unavailable(&self, case_id: &CaseId) -> StoreResult<bool>;

    /// Put a case back in rotation. Idempotent: re-availing an already
    /// available case is a no-op.
    fn mark_available(&self, case_id: &CaseId) -> StoreResult<()>;
}

/// Trait for debate storage
pub trait DebateStore: Send + Sync {
    /// Open a debate on a case. At most one non-completed debate may
    /// exist per case; a second open fails with CaseUnavailable.
    fn open(
        &self,
        case_id: &CaseId,
        professional_email: &str,
        started_at: DateTime<Utc>,
    ) -> StoreResult<DebateId>;

    /// Get a debate by id
    fn get(&self, debate_id: DebateId) -> StoreResult<Option<Debate>>;

    /// Conditionally complete the debate: flips completed false -> true.
    /// Returns false when the debate was already completed or is unknown.
    fn complete(&self, debate_id: DebateId) -> StoreResult<bool>;

    /// Non-completed debates started on or before the cutoff
    fn list_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Debate>>;

    /// Non-completed debates started inside (from, to]
    fn list_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Debate>>;

    /// Try to take the sweeper lease until the given instant. Returns
    /// false while another live holder has it.
    fn try_sweep_lease(
        &self,
        holder: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Give the lease back (no-op when this holder does not have it)
    fn release_sweep_lease(&self, holder: &str) -> StoreResult<()>;
}

// Forward every trait through Arc so one store value can back all of
// them and tests can keep a handle on the store behind the server.
impl<T: ProfileStore> ProfileStore for Arc<T> {
    fn create(&self, email: &str, kind: ProfileKind) -> StoreResult<Profile> {
        (**self).create(email, kind)
    }

    fn get(&self, email: &str) -> StoreResult<Option<Profile>> {
        (**self).get(email)
    }

    fn mark_waiver(&self, email: &str) -> StoreResult<()> {
        (**self).mark_waiver(email)
    }

    fn get_credits(&self, email: &str) -> StoreResult<i64> {
        (**self).get_credits(email)
    }

    fn get_ranking(&self, email: &str) -> StoreResult<i64> {
        (**self).get_ranking(email)
    }
}

impl<T: CreditLedger> CreditLedger for Arc<T> {
    fn add_credits(&self, email: &str, delta: i64) -> StoreResult<i64> {
        (**self).add_credits(email, delta)
    }

    fn adjust_ranking(&self, email: &str, delta: i64) -> StoreResult<i64> {
        (**self).adjust_ranking(email, delta)
    }
}

impl<T: CaseStore> CaseStore for Arc<T> {
    fn insert(&self, case: &CaseRecord) -> StoreResult<()> {
        (**self).insert(case)
    }

    fn list_available(&self) -> StoreResult<Vec<CaseRecord>> {
        (**self).list_available()
    }

    fn get(&self, case_id: &CaseId) -> StoreResult<Option<CaseRecord>> {
        (**self).get(case_id)
    }

    fn get_report(&self, case_id: &CaseId) -> StoreResult<Option<AiReport>> {
        (**self).get_report(case_id)
    }

    fn mark_unavailable(&self, case_id: &CaseId) -> StoreResult<bool> {
        (**self).mark_unavailable(case_id)
    }

    fn mark_available(&self, case_id: &CaseId) -> StoreResult<()> {
        (**self).mark_available(case_id)
    }
}

impl<T: DebateStore> DebateStore for Arc<T> {
    fn open(
        &self,
        case_id: &CaseId,
        professional_email: &str,
        started_at: DateTime<Utc>,
    ) -> StoreResult<DebateId> {
        (**self).open(case_id, professional_email, started_at)
    }

    fn get(&self, debate_id: DebateId) -> StoreResult<Option<Debate>> {
        (**self).get(debate_id)
    }

    fn complete(&self, debate_id: DebateId) -> StoreResult<bool> {
        (**self).complete(debate_id)
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Debate>> {
        (**self).list_expired(cutoff)
    }

    fn list_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Debate>> {
        (**self).list_started_between(from, to)
    }

    fn try_sweep_lease(
        &self,
        holder: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<bool> {
        (**self).try_sweep_lease(holder, now, until)
    }

    fn release_sweep_lease(&self, holder: &str) -> StoreResult<()> {
        (**self).release_sweep_lease(holder)
    }
}
