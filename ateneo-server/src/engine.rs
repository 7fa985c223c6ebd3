//! Debate lifecycle engine
//!
//! The engine is the only composer of multi-store protocols. It owns the
//! credit-conservation guarantee of a claim: every path out of
//! [`DebateEngine::claim_case`] either leaves credits untouched with no
//! debate opened, or debits exactly one credit with exactly one open
//! debate bound to the case.
//!
//! Per case the lifecycle is: available; claimed (one open debate);
//! refuted (debate completed, case stays closed) or released on expiry
//! (debate completed, case available again, may be re-claimed). Refuted
//! is the only terminal state.

use chrono::{DateTime, Duration, Utc};

use ateneo_core::{AiReport, CaseOracle};

use crate::error::ApiError;
use crate::ids;
use crate::store::{
    CaseId, CaseRecord, CaseStore, CreditLedger, Debate, DebateId, DebateStore, ProfileKind,
    ProfileStore,
};

/// Credits debited by a claim. Not refunded on expiry.
pub const CLAIM_CREDIT_COST: i64 = 1;
/// Score at or above which a refutation earns ranking
pub const SUCCESS_THRESHOLD: u8 = 80;
/// Ranking points awarded for a successful refutation
pub const RANKING_AWARD: i64 = 1;
/// Minimum length of a case description, in characters
pub const MIN_CASE_CHARS: usize = 50;
/// Minimum length of a refutation, in characters
pub const MIN_REFUTATION_CHARS: usize = 100;
/// How many case ids are drawn before giving up on a collision streak
const CASE_ID_ATTEMPTS: usize = 3;

/// Result of a successful case submission
#[derive(Debug, Clone)]
pub struct SubmittedCase {
    pub case_id: CaseId,
    pub report: AiReport,
}

/// Result of a successful claim
#[derive(Debug, Clone, Copy)]
pub struct ClaimOutcome {
    pub debate_id: DebateId,
    pub remaining_credits: i64,
}

/// Result of a scored refutation
#[derive(Debug, Clone)]
pub struct RefutationOutcome {
    pub score: u8,
    pub ranking_delta: i64,
    pub message: String,
}

/// The debate lifecycle engine over profile, case and debate storage
/// plus the AI collaborator
#[derive(Clone)]
pub struct DebateEngine<P, C, D, O> {
    profiles: P,
    cases: C,
    debates: D,
    oracle: O,
}

impl<P, C, D, O> DebateEngine<P, C, D, O>
where
    P: ProfileStore + CreditLedger,
    C: CaseStore,
    D: DebateStore,
    O: CaseOracle,
{
    pub fn new(profiles: P, cases: C, debates: D, oracle: O) -> Self {
        Self {
            profiles,
            cases,
            debates,
            oracle,
        }
    }

    /// Volunteer action: generate a report for a case and persist both.
    ///
    /// Nothing is persisted unless generation succeeds, so an AI failure
    /// leaves no trace and the volunteer can simply retry.
    pub async fn submit_case(
        &self,
        volunteer_email: &str,
        case_text: &str,
    ) -> Result<SubmittedCase, ApiError> {
        let email = volunteer_email.to_lowercase();
        let profile = self
            .profiles
            .get(&email)?
            .ok_or(ApiError::ProfileNotFound)?;
        if profile.kind != ProfileKind::Volunteer {
            return Err(ApiError::PermissionDenied(
                "only volunteers can submit cases".to_string(),
            ));
        }
        if !profile.waiver_signed {
            return Err(ApiError::PermissionDenied(
                "waiver must be signed before submitting cases".to_string(),
            ));
        }
        if case_text.chars().count() < MIN_CASE_CHARS {
            return Err(ApiError::ValidationError(format!(
                "case description must be at least {} characters",
                MIN_CASE_CHARS
            )));
        }

        let report = self.oracle.generate_report(case_text).await?;
        report.validate()?;

        // Ids collide rarely; re-draw a few times before giving up.
        for _ in 0..CASE_ID_ATTEMPTS {
            let case_id = CaseId(ids::new_case_id());
            let record = CaseRecord {
                id: case_id.clone(),
                volunteer_email: email.clone(),
                report: report.clone(),
                available: true,
                created_at: Utc::now(),
            };
            match self.cases.insert(&record) {
                Ok(()) => {
                    tracing::info!(case_id = %case_id.0, volunteer = %email, "Case submitted");
                    return Ok(SubmittedCase { case_id, report });
                }
                Err(ApiError::CaseAlreadyExists) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ApiError::Internal(
            "could not allocate a unique case id".to_string(),
        ))
    }

    /// Cases currently open for claiming, newest first
    pub fn list_available(&self) -> Result<Vec<CaseRecord>, ApiError> {
        self.cases.list_available()
    }

    /// Professional action: debit one credit and bind the case to the
    /// caller by opening a debate.
    ///
    /// The protocol is debit, claim, open; each later failure compensates
    /// all earlier steps. The body holds no suspension points, so a
    /// dropped request cannot abandon it between the debit and its
    /// compensation.
    pub fn claim_case(
        &self,
        professional_email: &str,
        case_id: &CaseId,
    ) -> Result<ClaimOutcome, ApiError> {
        let email = professional_email.to_lowercase();
        let profile = self
            .profiles
            .get(&email)?
            .ok_or(ApiError::ProfileNotFound)?;
        if profile.kind != ProfileKind::Professional {
            return Err(ApiError::PermissionDenied(
                "only professionals can claim cases".to_string(),
            ));
        }

        // 1. Debit. The conditional update refuses an overdraw and
        //    nothing else has been touched yet.
        let remaining = self.profiles.add_credits(&email, -CLAIM_CREDIT_COST)?;

        // 2. Claim the case. Any failure from here on must restore the
        //    credit before surfacing.
        let claimed = match self.cases.mark_unavailable(case_id) {
            Ok(claimed) => claimed,
            Err(e) => {
                self.refund(&email);
                return Err(e);
            }
        };
        if !claimed {
            self.refund(&email);
            return Err(ApiError::CaseUnavailable);
        }

        // 3. Open the debate. On failure both prior steps are undone.
        let debate_id = match self.debates.open(case_id, &email, Utc::now()) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    case_id = %case_id.0,
                    error = %e,
                    "Opening debate failed; compensating claim"
                );
                if let Err(e) = self.cases.mark_available(case_id) {
                    tracing::error!(
                        case_id = %case_id.0,
                        error = %e,
                        "Claim compensation could not release the case"
                    );
                }
                self.refund(&email);
                return Err(ApiError::Internal("could not open debate".to_string()));
            }
        };

        tracing::info!(
            case_id = %case_id.0,
            professional = %email,
            debate_id = debate_id.0,
            remaining_credits = remaining,
            "Case claimed"
        );

        Ok(ClaimOutcome {
            debate_id,
            remaining_credits: remaining,
        })
    }

    fn refund(&self, email: &str) {
        if let Err(e) = self.profiles.add_credits(email, CLAIM_CREDIT_COST) {
            tracing::error!(professional = %email, error = %e, "Failed to refund claim credit");
        }
    }

    /// Professional action: score the refutation against the case's
    /// frozen report and close the debate.
    ///
    /// The debate is completed before any ranking is awarded, so a
    /// sweeper racing this submission can never double-settle it.
    pub async fn submit_refutation(
        &self,
        debate_id: DebateId,
        professional_email: &str,
        refutation_text: &str,
    ) -> Result<RefutationOutcome, ApiError> {
        if refutation_text.chars().count() < MIN_REFUTATION_CHARS {
            return Err(ApiError::ValidationError(format!(
                "refutation must be at least {} characters",
                MIN_REFUTATION_CHARS
            )));
        }

        let email = professional_email.to_lowercase();
        let debate = self
            .debates
            .get(debate_id)?
            .ok_or(ApiError::DebateNotFound)?;
        if debate.professional_email != email {
            return Err(ApiError::PermissionDenied(
                "debate belongs to another professional".to_string(),
            ));
        }
        if debate.completed {
            return Err(self.closed_debate_error(&debate.case_id));
        }

        let report = self.cases.get_report(&debate.case_id)?.ok_or_else(|| {
            ApiError::Internal(format!("case {} has no stored report", debate.case_id.0))
        })?;

        // Any scoring failure counts as a zero-score refutation.
        let score = match self.oracle.score_refutation(&report, refutation_text).await {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(
                    debate_id = debate_id.0,
                    error = %e,
                    "Scoring failed; treating refutation as score 0"
                );
                0
            }
        };

        // Conditional completion; losing this flip means the sweeper (or
        // a concurrent submission) settled the debate first.
        if !self.debates.complete(debate_id)? {
            return Err(self.closed_debate_error(&debate.case_id));
        }

        let ranking_delta = if score >= SUCCESS_THRESHOLD {
            self.profiles.adjust_ranking(&email, RANKING_AWARD)?;
            RANKING_AWARD
        } else {
            0
        };

        let message = if ranking_delta > 0 {
            format!(
                "Congratulations! Your refutation (score: {}) succeeded and earned {} ranking point.",
                score, ranking_delta
            )
        } else {
            format!(
                "Refutation recorded (score: {}). It did not reach the threshold to earn ranking this time.",
                score
            )
        };

        tracing::info!(
            debate_id = debate_id.0,
            professional = %email,
            score,
            ranking_delta,
            "Refutation submitted"
        );

        Ok(RefutationOutcome {
            score,
            ranking_delta,
            message,
        })
    }

    /// Classify a settled debate: released by the sweeper (its case is
    /// available again) or closed by a scored submission.
    fn closed_debate_error(&self, case_id: &CaseId) -> ApiError {
        match self.cases.get(case_id) {
            Ok(Some(case)) if case.available => ApiError::Expired,
            Ok(Some(_)) => ApiError::AlreadyCompleted,
            Ok(None) => {
                ApiError::Internal(format!("case {} missing for completed debate", case_id.0))
            }
            Err(e) => e,
        }
    }

    /// Release debates older than the threshold, one case at a time:
    /// the case returns to rotation, then its debate settles. No credit
    /// is refunded.
    pub fn release_expired(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Result<Vec<CaseId>, ApiError> {
        let cutoff = now - threshold;
        let expired = self.debates.list_expired(cutoff)?;

        let mut released = Vec::new();
        for debate in expired {
            // Release before settling: a pass interrupted between the
            // two leaves the debate open, so the next sweep lists it
            // again and retries the pair (mark_available is idempotent
            // under that retry).
            self.cases.mark_available(&debate.case_id)?;
            self.debates.complete(debate.id)?;
            released.push(debate.case_id);
        }

        if !released.is_empty() {
            tracing::info!(
                count = released.len(),
                cases = ?released.iter().map(|c| c.0.as_str()).collect::<Vec<_>>(),
                "Released expired debates"
            );
        }

        Ok(released)
    }

    /// Open debates whose age is inside `[threshold - alert_window,
    /// threshold)`: the alert pass enumeration, without mutation
    pub fn expiring_soon(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
        alert_window: Duration,
    ) -> Result<Vec<Debate>, ApiError> {
        let from = now - threshold;
        let to = from + alert_window;
        self.debates.list_started_between(from, to)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use ateneo_core::Error as AiError;

    use super::*;
    use crate::store::{InMemoryCaseStore, InMemoryDebateStore, InMemoryProfileStore, StoreResult};

    /// Deterministic oracle for driving the engine in tests
    #[derive(Clone)]
    struct StubOracle {
        score: u8,
        fail_generation: bool,
        permanent_generation_failure: bool,
        fail_scoring: bool,
    }

    impl StubOracle {
        fn scoring(score: u8) -> Self {
            Self {
                score,
                fail_generation: false,
                permanent_generation_failure: false,
                fail_scoring: false,
            }
        }
    }

    fn stub_report() -> AiReport {
        AiReport::new(
            "Acute myocardial infarction",
            "Crushing chest pain with ST elevation and raised troponin",
            vec![
                "Could this be a pericarditis mimic?".to_string(),
                "Was the troponin rise serial or single?".to_string(),
                "Do the ECG changes localize consistently?".to_string(),
            ],
        )
    }

    #[async_trait]
    impl CaseOracle for StubOracle {
        async fn generate_report(&self, _case_text: &str) -> ateneo_core::Result<AiReport> {
            if self.permanent_generation_failure {
                return Err(AiError::Permanent("input rejected".to_string()));
            }
            if self.fail_generation {
                return Err(AiError::Transient("model offline".to_string()));
            }
            Ok(stub_report())
        }

        async fn score_refutation(
            &self,
            _report: &AiReport,
            _refutation: &str,
        ) -> ateneo_core::Result<u8> {
            if self.fail_scoring {
                return Err(AiError::Transient("scoring offline".to_string()));
            }
            Ok(self.score)
        }
    }

    /// Case store whose mark_available can be switched to fail, for
    /// driving the release pass through its error branch
    struct FlakyCaseStore {
        inner: InMemoryCaseStore,
        fail_mark_available: AtomicBool,
    }

    impl FlakyCaseStore {
        fn new() -> Self {
            Self {
                inner: InMemoryCaseStore::new(),
                fail_mark_available: AtomicBool::new(false),
            }
        }
    }

    impl CaseStore for FlakyCaseStore {
        fn insert(&self, case: &CaseRecord) -> StoreResult<()> {
            self.inner.insert(case)
        }

        fn list_available(&self) -> StoreResult<Vec<CaseRecord>> {
            self.inner.list_available()
        }

        fn get(&self, case_id: &CaseId) -> StoreResult<Option<CaseRecord>> {
            self.inner.get(case_id)
        }

        fn get_report(&self, case_id: &CaseId) -> StoreResult<Option<AiReport>> {
            self.inner.get_report(case_id)
        }

        fn mark_unavailable(&self, case_id: &CaseId) -> StoreResult<bool> {
            self.inner.mark_unavailable(case_id)
        }

        fn mark_available(&self, case_id: &CaseId) -> StoreResult<()> {
            if self.fail_mark_available.load(Ordering::SeqCst) {
                return Err(ApiError::Internal("case store offline".to_string()));
            }
            self.inner.mark_available(case_id)
        }
    }

    struct Rig {
        engine: DebateEngine<
            Arc<InMemoryProfileStore>,
            Arc<InMemoryCaseStore>,
            Arc<InMemoryDebateStore>,
            StubOracle,
        >,
        profiles: Arc<InMemoryProfileStore>,
        cases: Arc<InMemoryCaseStore>,
        debates: Arc<InMemoryDebateStore>,
    }

    fn rig(oracle: StubOracle) -> Rig {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let cases = Arc::new(InMemoryCaseStore::new());
        let debates = Arc::new(InMemoryDebateStore::new());
        let engine = DebateEngine::new(
            profiles.clone(),
            cases.clone(),
            debates.clone(),
            oracle,
        );
        Rig {
            engine,
            profiles,
            cases,
            debates,
        }
    }

    fn volunteer(rig: &Rig, email: &str) {
        rig.profiles.create(email, ProfileKind::Volunteer).unwrap();
        rig.profiles.mark_waiver(email).unwrap();
    }

    fn professional(rig: &Rig, email: &str, credits: i64) {
        rig.profiles
            .create(email, ProfileKind::Professional)
            .unwrap();
        rig.profiles.mark_waiver(email).unwrap();
        if credits > 0 {
            rig.profiles.add_credits(email, credits).unwrap();
        }
    }

    const CASE_TEXT: &str = "55-year-old patient with fever, dry cough and progressive \
                             dyspnea over five days; bilateral infiltrates on imaging.";

    fn refutation_text() -> String {
        "The troponin elevation is modest and the ST changes are diffuse rather than \
         territorial, which together with the positional character of the pain argues \
         for acute pericarditis over infarction."
            .to_string()
    }

    async fn submitted_case(rig: &Rig) -> SubmittedCase {
        volunteer(rig, "vol@example.com");
        rig.engine
            .submit_case("vol@example.com", CASE_TEXT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_case_persists_frozen_report() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;

        assert_eq!(submitted.case_id.0.len(), 8);
        assert_eq!(submitted.report.questions.len(), 3);

        let stored = r.cases.get(&submitted.case_id).unwrap().unwrap();
        assert!(stored.available);
        assert_eq!(stored.report, submitted.report);
        assert_eq!(stored.volunteer_email, "vol@example.com");
    }

    #[tokio::test]
    async fn test_submit_case_preconditions() {
        let r = rig(StubOracle::scoring(0));

        let result = r.engine.submit_case("ghost@example.com", CASE_TEXT).await;
        assert!(matches!(result, Err(ApiError::ProfileNotFound)));

        professional(&r, "pro@example.com", 1);
        let result = r.engine.submit_case("pro@example.com", CASE_TEXT).await;
        assert!(matches!(result, Err(ApiError::PermissionDenied(_))));

        r.profiles
            .create("unsigned@example.com", ProfileKind::Volunteer)
            .unwrap();
        let result = r.engine.submit_case("unsigned@example.com", CASE_TEXT).await;
        assert!(matches!(result, Err(ApiError::PermissionDenied(_))));

        volunteer(&r, "vol@example.com");
        let result = r.engine.submit_case("vol@example.com", "too short").await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_submit_case_ai_failure_persists_nothing() {
        let mut oracle = StubOracle::scoring(0);
        oracle.fail_generation = true;
        let r = rig(oracle);
        volunteer(&r, "vol@example.com");

        let result = r.engine.submit_case("vol@example.com", CASE_TEXT).await;
        assert!(matches!(result, Err(ApiError::TransientAi(_))));
        assert!(r.cases.list_available().unwrap().is_empty());

        let mut oracle = StubOracle::scoring(0);
        oracle.permanent_generation_failure = true;
        let r = rig(oracle);
        volunteer(&r, "vol@example.com");

        let result = r.engine.submit_case("vol@example.com", CASE_TEXT).await;
        assert!(matches!(result, Err(ApiError::PermanentAi(_))));
        assert!(r.cases.list_available().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_debits_and_opens_debate() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 2);

        let outcome = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();
        assert_eq!(outcome.remaining_credits, 1);
        assert_eq!(r.profiles.get_credits("pro@example.com").unwrap(), 1);

        let debate = r.debates.get(outcome.debate_id).unwrap().unwrap();
        assert_eq!(debate.case_id, submitted.case_id);
        assert_eq!(debate.professional_email, "pro@example.com");
        assert!(!debate.completed);

        assert!(!r.cases.get(&submitted.case_id).unwrap().unwrap().available);
    }

    #[tokio::test]
    async fn test_claim_insufficient_credits_changes_nothing() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 0);

        let result = r.engine.claim_case("pro@example.com", &submitted.case_id);
        assert!(matches!(result, Err(ApiError::InsufficientCredits)));

        assert_eq!(r.profiles.get_credits("pro@example.com").unwrap(), 0);
        assert!(r.cases.get(&submitted.case_id).unwrap().unwrap().available);
        assert!(r.debates.get(DebateId(1)).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_unavailable_case_refunds() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;
        professional(&r, "first@example.com", 1);
        professional(&r, "second@example.com", 1);

        r.engine
            .claim_case("first@example.com", &submitted.case_id)
            .unwrap();

        let result = r.engine.claim_case("second@example.com", &submitted.case_id);
        assert!(matches!(result, Err(ApiError::CaseUnavailable)));
        assert_eq!(r.profiles.get_credits("second@example.com").unwrap(), 1);

        // Unknown case ids fold into the same not-claimable outcome.
        let result = r
            .engine
            .claim_case("second@example.com", &CaseId("missing0".to_string()));
        assert!(matches!(result, Err(ApiError::CaseUnavailable)));
        assert_eq!(r.profiles.get_credits("second@example.com").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_requires_professional() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;

        let result = r.engine.claim_case("vol@example.com", &submitted.case_id);
        assert!(matches!(result, Err(ApiError::PermissionDenied(_))));
        assert!(r.cases.get(&submitted.case_id).unwrap().unwrap().available);

        let result = r.engine.claim_case("ghost@example.com", &submitted.case_id);
        assert!(matches!(result, Err(ApiError::ProfileNotFound)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_claims_have_one_winner() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;

        let contenders = 8;
        for i in 0..contenders {
            professional(&r, &format!("pro{}@example.com", i), 1);
        }

        let barrier = Arc::new(std::sync::Barrier::new(contenders));
        let mut handles = Vec::new();
        for i in 0..contenders {
            let engine = r.engine.clone();
            let case_id = submitted.case_id.clone();
            let barrier = barrier.clone();
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                engine.claim_case(&format!("pro{}@example.com", i), &case_id)
            }));
        }

        let mut winners = 0;
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.join().unwrap() {
                Ok(outcome) => {
                    winners += 1;
                    assert_eq!(outcome.remaining_credits, 0);
                }
                Err(ApiError::CaseUnavailable) => {
                    // Losers keep their credit.
                    let email = format!("pro{}@example.com", i);
                    assert_eq!(r.profiles.get_credits(&email).unwrap(), 1);
                }
                Err(e) => panic!("unexpected claim outcome: {}", e),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_refutation_success_awards_ranking() {
        let r = rig(StubOracle::scoring(90));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 2);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let outcome = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await
            .unwrap();

        assert_eq!(outcome.score, 90);
        assert_eq!(outcome.ranking_delta, 1);
        assert_eq!(r.profiles.get_ranking("pro@example.com").unwrap(), 1);
        assert!(r.debates.get(claim.debate_id).unwrap().unwrap().completed);
        // A refuted case never returns to rotation.
        assert!(!r.cases.get(&submitted.case_id).unwrap().unwrap().available);
    }

    #[tokio::test]
    async fn test_refutation_threshold_boundary() {
        for (score, expected_delta) in [(79u8, 0i64), (80, 1), (50, 0), (100, 1)] {
            let r = rig(StubOracle::scoring(score));
            let submitted = submitted_case(&r).await;
            professional(&r, "pro@example.com", 1);
            let claim = r
                .engine
                .claim_case("pro@example.com", &submitted.case_id)
                .unwrap();

            let outcome = r
                .engine
                .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
                .await
                .unwrap();

            assert_eq!(outcome.score, score);
            assert_eq!(outcome.ranking_delta, expected_delta, "score {}", score);
            assert_eq!(
                r.profiles.get_ranking("pro@example.com").unwrap(),
                expected_delta
            );
            assert!(r.debates.get(claim.debate_id).unwrap().unwrap().completed);
        }
    }

    #[tokio::test]
    async fn test_refutation_scoring_failure_scores_zero() {
        let mut oracle = StubOracle::scoring(90);
        oracle.fail_scoring = true;
        let r = rig(oracle);
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let outcome = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await
            .unwrap();

        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.ranking_delta, 0);
        assert!(r.debates.get(claim.debate_id).unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_refutation_validation_and_ownership() {
        let r = rig(StubOracle::scoring(90));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        professional(&r, "other@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let result = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", "too short")
            .await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));

        let result = r
            .engine
            .submit_refutation(claim.debate_id, "other@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::PermissionDenied(_))));

        let result = r
            .engine
            .submit_refutation(DebateId(999), "pro@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::DebateNotFound)));

        // None of the failures settled the debate.
        assert!(!r.debates.get(claim.debate_id).unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_double_submission_reports_already_completed() {
        let r = rig(StubOracle::scoring(90));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        r.engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await
            .unwrap();

        let result = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::AlreadyCompleted)));
        // No second award.
        assert_eq!(r.profiles.get_ranking("pro@example.com").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_release_expired_and_late_submission() {
        let r = rig(StubOracle::scoring(90));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let now = Utc::now();
        r.debates
            .set_started_at(claim.debate_id, now - Duration::hours(25))
            .unwrap();

        let released = r.engine.release_expired(now, Duration::hours(24)).unwrap();
        assert_eq!(released, vec![submitted.case_id.clone()]);
        assert!(r.cases.get(&submitted.case_id).unwrap().unwrap().available);
        assert!(r.debates.get(claim.debate_id).unwrap().unwrap().completed);

        // The committed credit stays spent.
        assert_eq!(r.profiles.get_credits("pro@example.com").unwrap(), 0);

        let result = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::Expired)));
        assert_eq!(r.profiles.get_ranking("pro@example.com").unwrap(), 0);

        // A second sweep finds nothing left to release.
        let released = r.engine.release_expired(now, Duration::hours(24)).unwrap();
        assert!(released.is_empty());
    }

    #[tokio::test]
    async fn test_release_boundary_is_inclusive() {
        let r = rig(StubOracle::scoring(0));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let now = Utc::now();
        let threshold = Duration::hours(24);

        // One second short of the threshold: not yet expired.
        r.debates
            .set_started_at(claim.debate_id, now - threshold + Duration::seconds(1))
            .unwrap();
        assert!(r.engine.release_expired(now, threshold).unwrap().is_empty());

        // Exactly at the threshold: released.
        r.debates
            .set_started_at(claim.debate_id, now - threshold)
            .unwrap();
        let released = r.engine.release_expired(now, threshold).unwrap();
        assert_eq!(released.len(), 1);
    }

    #[tokio::test]
    async fn test_release_failure_leaves_debate_for_next_sweep() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let cases = Arc::new(FlakyCaseStore::new());
        let debates = Arc::new(InMemoryDebateStore::new());
        let engine = DebateEngine::new(
            profiles.clone(),
            cases.clone(),
            debates.clone(),
            StubOracle::scoring(90),
        );

        profiles
            .create("pro@example.com", ProfileKind::Professional)
            .unwrap();
        profiles.mark_waiver("pro@example.com").unwrap();

        let case_id = CaseId("abcd1234".to_string());
        cases
            .insert(&CaseRecord {
                id: case_id.clone(),
                volunteer_email: "vol@example.com".to_string(),
                report: stub_report(),
                available: false,
                created_at: Utc::now(),
            })
            .unwrap();
        let now = Utc::now();
        let debate_id = debates
            .open(&case_id, "pro@example.com", now - Duration::hours(25))
            .unwrap();

        cases.fail_mark_available.store(true, Ordering::SeqCst);
        let result = engine.release_expired(now, Duration::hours(24));
        assert!(matches!(result, Err(ApiError::Internal(_))));

        // The failed pass moved nothing: the debate is still open, the
        // case still held, so the debate stays in the expired listing.
        assert!(!debates.get(debate_id).unwrap().unwrap().completed);
        assert!(!cases.get(&case_id).unwrap().unwrap().available);

        cases.fail_mark_available.store(false, Ordering::SeqCst);
        let released = engine.release_expired(now, Duration::hours(24)).unwrap();
        assert_eq!(released, vec![case_id.clone()]);
        assert!(cases.get(&case_id).unwrap().unwrap().available);
        assert!(debates.get(debate_id).unwrap().unwrap().completed);

        let result = engine
            .submit_refutation(debate_id, "pro@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::Expired)));
    }

    #[tokio::test]
    async fn test_release_resumes_after_partial_pass() {
        let r = rig(StubOracle::scoring(90));
        let submitted = submitted_case(&r).await;
        professional(&r, "pro@example.com", 1);
        let claim = r
            .engine
            .claim_case("pro@example.com", &submitted.case_id)
            .unwrap();

        let now = Utc::now();
        r.debates
            .set_started_at(claim.debate_id, now - Duration::hours(25))
            .unwrap();

        // A pass interrupted after re-availing the case leaves the
        // debate open and still listed as expired; the next pass
        // finishes the pair.
        r.cases.mark_available(&submitted.case_id).unwrap();

        let released = r.engine.release_expired(now, Duration::hours(24)).unwrap();
        assert_eq!(released, vec![submitted.case_id.clone()]);
        assert!(r.cases.get(&submitted.case_id).unwrap().unwrap().available);
        assert!(r.debates.get(claim.debate_id).unwrap().unwrap().completed);

        let result = r
            .engine
            .submit_refutation(claim.debate_id, "pro@example.com", &refutation_text())
            .await;
        assert!(matches!(result, Err(ApiError::Expired)));
    }

    #[tokio::test]
    async fn test_released_case_can_cycle_to_refuted() {
        let r = rig(StubOracle::scoring(85));
        let submitted = submitted_case(&r).await;
        professional(&r, "first@example.com", 1);
        professional(&r, "second@example.com", 1);

        let first_claim = r
            .engine
            .claim_case("first@example.com", &submitted.case_id)
            .unwrap();
        let now = Utc::now();
        r.debates
            .set_started_at(first_claim.debate_id, now - Duration::hours(25))
            .unwrap();
        r.engine.release_expired(now, Duration::hours(24)).unwrap();

        // The released case is claimable again; the new debate settles
        // normally and the case leaves rotation for good.
        let second_claim = r
            .engine
            .claim_case("second@example.com", &submitted.case_id)
            .unwrap();
        assert_ne!(second_claim.debate_id, first_claim.debate_id);

        let outcome = r
            .engine
            .submit_refutation(second_claim.debate_id, "second@example.com", &refutation_text())
            .await
            .unwrap();
        assert_eq!(outcome.ranking_delta, 1);
        assert!(!r.cases.get(&submitted.case_id).unwrap().unwrap().available);
    }

    #[tokio::test]
    async fn test_expiring_soon_window() {
        let r = rig(StubOracle::scoring(0));
        volunteer(&r, "vol@example.com");
        professional(&r, "pro@example.com", 3);

        let mut claims = Vec::new();
        for _ in 0..3 {
            let submitted = r
                .engine
                .submit_case("vol@example.com", CASE_TEXT)
                .await
                .unwrap();
            claims.push(
                r.engine
                    .claim_case("pro@example.com", &submitted.case_id)
                    .unwrap(),
            );
        }

        let now = Utc::now();
        let threshold = Duration::hours(24);
        let window = Duration::hours(2);

        // 23h old: alerting; 25h old: already expired; 1h old: fresh.
        r.debates
            .set_started_at(claims[0].debate_id, now - Duration::hours(23))
            .unwrap();
        r.debates
            .set_started_at(claims[1].debate_id, now - Duration::hours(25))
            .unwrap();
        r.debates
            .set_started_at(claims[2].debate_id, now - Duration::hours(1))
            .unwrap();

        let soon = r.engine.expiring_soon(now, threshold, window).unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].id, claims[0].debate_id);
    }
}
