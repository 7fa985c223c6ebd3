//! Common test utilities for server integration tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};

use ateneo_core::{AiReport, CaseOracle};
use ateneo_server::notify::Notifier;
use ateneo_server::store::{InMemoryCaseStore, InMemoryDebateStore, InMemoryProfileStore};
use ateneo_server::{routes, AppState, SweepConfig};

/// A case description long enough to pass validation
pub const CASE_TEXT: &str = "62-year-old patient with sudden epigastric pain radiating to \
                             the back, repeated vomiting and a lipase three times the upper \
                             limit of normal.";

/// A refutation long enough to pass validation
pub fn long_refutation() -> String {
    "The pain is positional and improves when leaning forward, the lipase rise is \
     isolated without imaging correlate, and the history of pericardial friction rub \
     suggests a different primary process than the one proposed."
        .to_string()
}

pub fn test_report() -> AiReport {
    AiReport::new(
        "Acute pancreatitis",
        "Epigastric pain radiating to the back with a threefold lipase elevation",
        vec![
            "Could biliary obstruction explain the presentation?".to_string(),
            "Is there relevant alcohol exposure?".to_string(),
            "Was hypertriglyceridemia excluded?".to_string(),
        ],
    )
}

/// Scriptable oracle: generation returns a fixed report (or fails when
/// told to), scoring pops pre-programmed outcomes
#[derive(Default, Clone)]
pub struct StubOracle {
    scores: Arc<Mutex<VecDeque<ateneo_core::Result<u8>>>>,
    fail_generation: Arc<Mutex<bool>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the score the next refutation receives
    pub fn push_score(&self, score: u8) {
        self.scores.lock().unwrap().push_back(Ok(score));
    }

    /// Queue a scoring failure for the next refutation
    pub fn push_score_failure(&self) {
        self.scores
            .lock()
            .unwrap()
            .push_back(Err(ateneo_core::Error::Transient(
                "scoring offline".to_string(),
            )));
    }

    pub fn set_fail_generation(&self, fail: bool) {
        *self.fail_generation.lock().unwrap() = fail;
    }
}

#[async_trait]
impl CaseOracle for StubOracle {
    async fn generate_report(&self, _case_text: &str) -> ateneo_core::Result<AiReport> {
        if *self.fail_generation.lock().unwrap() {
            return Err(ateneo_core::Error::Transient("model offline".to_string()));
        }
        Ok(test_report())
    }

    async fn score_refutation(
        &self,
        _report: &AiReport,
        _refutation: &str,
    ) -> ateneo_core::Result<u8> {
        // An unscripted refutation scores zero.
        self.scores.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }
}

/// Mock notifier that captures expiry warnings
#[derive(Default, Clone)]
pub struct MockNotifier {
    /// Captured (email, case_id, hours_left) triples
    pub sent: Arc<RwLock<Vec<(String, String, i64)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings_for(&self, email: &str) -> usize {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|(e, _, _)| e == email)
            .count()
    }
}

impl Notifier for MockNotifier {
    fn send_expiry_warning(
        &self,
        email: &str,
        case_id: &str,
        hours_left: i64,
    ) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), case_id.to_string(), hours_left));
        Ok(())
    }
}

/// A test server plus handles on everything behind it
pub struct TestContext {
    pub server: TestServer,
    pub oracle: StubOracle,
    pub notifier: MockNotifier,
    pub profiles: Arc<InMemoryProfileStore>,
    pub cases: Arc<InMemoryCaseStore>,
    pub debates: Arc<InMemoryDebateStore>,
}

/// Create a test server over in-memory stores and a scriptable oracle
pub fn create_test_server() -> TestContext {
    let profiles = Arc::new(InMemoryProfileStore::new());
    let cases = Arc::new(InMemoryCaseStore::new());
    let debates = Arc::new(InMemoryDebateStore::new());
    let oracle = StubOracle::new();
    let notifier = MockNotifier::new();

    let state = Arc::new(AppState::new(
        profiles.clone(),
        cases.clone(),
        debates.clone(),
        oracle.clone(),
        Box::new(notifier.clone()),
        SweepConfig::default(),
    ));

    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    TestContext {
        server,
        oracle,
        notifier,
        profiles,
        cases,
        debates,
    }
}

/// Register a profile and sign the waiver
pub async fn sign_waiver(server: &TestServer, email: &str, kind: &str) {
    let response = server
        .post("/api/v1/auth/waiver")
        .json(&json!({ "email": email, "kind": kind }))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Top up a professional's balance, returning the new balance
pub async fn add_credits(server: &TestServer, email: &str, delta: i64) -> i64 {
    let response = server
        .post("/api/v1/credits/add")
        .json(&json!({ "email": email, "delta": delta }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["balance"].as_i64().unwrap()
}

/// Submit a case as the given volunteer, returning the case id
pub async fn submit_case(server: &TestServer, volunteer: &str) -> String {
    let response = server
        .post("/api/v1/cases")
        .json(&json!({ "volunteer_email": volunteer, "case_text": CASE_TEXT }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["case_id"].as_str().unwrap().to_string()
}

/// Claim a case as the given professional, returning the debate id
pub async fn claim_case(server: &TestServer, professional: &str, case_id: &str) -> i64 {
    let response = server
        .post(&format!("/api/v1/cases/{}/claim", case_id))
        .json(&json!({ "professional_email": professional }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["debate_id"].as_i64().unwrap()
}
