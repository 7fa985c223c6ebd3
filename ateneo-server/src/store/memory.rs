//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, RwLock};

use ateneo_core::AiReport;
use chrono::{DateTime, Utc};

use super::{
    CaseId, CaseRecord, CaseStore, CreditLedger, Debate, DebateId, DebateStore, Profile,
    ProfileKind, ProfileStore, StoreResult,
};
use crate::error::ApiError;

/// In-memory profile store
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn create(&self, email: &str, kind: ProfileKind) -> StoreResult<Profile> {
        let normalized = email.to_lowercase();
        let mut profiles = self.profiles.write().unwrap();
        if profiles.contains_key(&normalized) {
            return Err(ApiError::ProfileAlreadyExists);
        }
        let profile = Profile {
            email: normalized.clone(),
            kind,
            waiver_signed: false,
            ranking: 0,
            credits: 0,
            created_at: Utc::now(),
        };
        profiles.insert(normalized, profile.clone());
        Ok(profile)
    }

    fn get(&self, email: &str) -> StoreResult<Option<Profile>> {
        let normalized = email.to_lowercase();
        Ok(self.profiles.read().unwrap().get(&normalized).cloned())
    }

    fn mark_waiver(&self, email: &str) -> StoreResult<()> {
        let normalized = email.to_lowercase();
        let mut profiles = self.profiles.write().unwrap();
        if let Some(profile) = profiles.get_mut(&normalized) {
            profile.waiver_signed = true;
            Ok(())
        } else {
            Err(ApiError::ProfileNotFound)
        }
    }

    fn get_credits(&self, email: &str) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let profiles = self.profiles.read().unwrap();
        profiles
            .get(&normalized)
            .map(|p| p.credits)
            .ok_or(ApiError::ProfileNotFound)
    }

    fn get_ranking(&self, email: &str) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let profiles = self.profiles.read().unwrap();
        profiles
            .get(&normalized)
            .map(|p| p.ranking)
            .ok_or(ApiError::ProfileNotFound)
    }
}

impl CreditLedger for InMemoryProfileStore {
    fn add_credits(&self, email: &str, delta: i64) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let mut profiles = self.profiles.write().unwrap();
        let profile = profiles
            .get_mut(&normalized)
            .ok_or(ApiError::ProfileNotFound)?;
        let updated = profile
            .credits
            .checked_add(delta)
            .ok_or_else(|| ApiError::ValidationError("credit delta out of range".to_string()))?;
        if updated < 0 {
            return Err(ApiError::InsufficientCredits);
        }
        profile.credits = updated;
        Ok(updated)
    }

    fn adjust_ranking(&self, email: &str, delta: i64) -> StoreResult<i64> {
        let normalized = email.to_lowercase();
        let mut profiles = self.profiles.write().unwrap();
        let profile = profiles
            .get_mut(&normalized)
            .ok_or(ApiError::ProfileNotFound)?;
        let updated = profile
            .ranking
            .checked_add(delta)
            .ok_or_else(|| ApiError::ValidationError("ranking delta out of range".to_string()))?;
        if updated < 0 {
            return Err(ApiError::ValidationError(
                "ranking cannot go below zero".to_string(),
            ));
        }
        profile.ranking = updated;
        Ok(updated)
    }
}

/// In-memory case store
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<String, CaseRecord>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self {
            cases: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseStore for InMemoryCaseStore {
    fn insert(&self, case: &CaseRecord) -> StoreResult<()> {
        let mut cases = self.cases.write().unwrap();
        if cases.contains_key(&case.id.0) {
            return Err(ApiError::CaseAlreadyExists);
        }
        cases.insert(case.id.0.clone(), case.clone());
        Ok(())
    }

    fn list_available(&self) -> StoreResult<Vec<CaseRecord>> {
        let cases = self.cases.read().unwrap();
        let mut available: Vec<CaseRecord> =
            cases.values().filter(|c| c.available).cloned().collect();
        available.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.0.cmp(&a.id.0))
        });
        Ok(available)
    }

    fn get(&self, case_id: &CaseId) -> StoreResult<Option<CaseRecord>> {
        Ok(self.cases.read().unwrap().get(&case_id.0).cloned())
    }

    fn get_report(&self, case_id: &CaseId) -> StoreResult<Option<AiReport>> {
        Ok(self
            .cases
            .read()
            .unwrap()
            .get(&case_id.0)
            .map(|c| c.report.clone()))
    }

    fn mark_unavailable(&self, case_id: &CaseId) -> StoreResult<bool> {
        let mut cases = self.cases.write().unwrap();
        match cases.get_mut(&case_id.0) {
            Some(case) if case.available => {
                case.available = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn mark_available(&self, case_id: &CaseId) -> StoreResult<()> {
        let mut cases = self.cases.write().unwrap();
        if let Some(case) = cases.get_mut(&case_id.0) {
            case.available = true;
            Ok(())
        } else {
            Err(ApiError::CaseNotFound)
        }
    }
}

/// In-memory debate store
pub struct InMemoryDebateStore {
    debates: RwLock<HashMap<i64, Debate>>,
    next_debate_id: AtomicI64,
    lease: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl InMemoryDebateStore {
    pub fn new() -> Self {
        Self {
            debates: RwLock::new(HashMap::new()),
            next_debate_id: AtomicI64::new(1),
            lease: Mutex::new(None),
        }
    }

    /// Backdate a debate's start (for testing purposes)
    pub fn set_started_at(
        &self,
        debate_id: DebateId,
        started_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut debates = self.debates.write().unwrap();
        if let Some(debate) = debates.get_mut(&debate_id.0) {
            debate.started_at = started_at;
            Ok(())
        } else {
            Err(ApiError::DebateNotFound)
        }
    }
}

impl Default for InMemoryDebateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DebateStore for InMemoryDebateStore {
    fn open(
        &self,
        case_id: &CaseId,
        professional_email: &str,
        started_at: DateTime<Utc>,
    ) -> StoreResult<DebateId> {
        let normalized = professional_email.to_lowercase();
        let mut debates = self.debates.write().unwrap();
        if debates
            .values()
            .any(|d| d.case_id == *case_id && !d.completed)
        {
            return Err(ApiError::CaseUnavailable);
        }
        let id = DebateId(self.next_debate_id.fetch_add(1, Ordering::SeqCst));
        debates.insert(
            id.0,
            Debate {
                id,
                case_id: case_id.clone(),
                professional_email: normalized,
                started_at,
                completed: false,
            },
        );
        Ok(id)
    }

    fn get(&self, debate_id: DebateId) -> StoreResult<Option<Debate>> {
        Ok(self.debates.read().unwrap().get(&debate_id.0).cloned())
    }

    fn complete(&self, debate_id: DebateId) -> StoreResult<bool> {
        let mut debates = self.debates.write().unwrap();
        match debates.get_mut(&debate_id.0) {
            Some(debate) if !debate.completed => {
                debate.completed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Debate>> {
        let debates = self.debates.read().unwrap();
        Ok(debates
            .values()
            .filter(|d| !d.completed && d.started_at <= cutoff)
            .cloned()
            .collect())
    }

    fn list_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Debate>> {
        let debates = self.debates.read().unwrap();
        Ok(debates
            .values()
            .filter(|d| !d.completed && d.started_at > from && d.started_at <= to)
            .cloned()
            .collect())
    }

    fn try_sweep_lease(
        &self,
        holder: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut lease = self.lease.lock().unwrap();
        match lease.as_ref() {
            Some((current, expires)) if current != holder && *expires > now => Ok(false),
            _ => {
                *lease = Some((holder.to_string(), until));
                Ok(true)
            }
        }
    }

    fn release_sweep_lease(&self, holder: &str) -> StoreResult<()> {
        let mut lease = self.lease.lock().unwrap();
        if let Some((current, _)) = lease.as_ref() {
            if current == holder {
                *lease = None;
            }
        }
        Ok(())
    }
}
