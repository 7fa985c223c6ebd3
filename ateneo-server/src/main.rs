//! Ateneo case debate server
//!
//! Volunteers upload anonymized clinical cases, an AI collaborator
//! writes a preliminary report for each, and professionals spend
//! credits to claim a case and debate the AI by refuting its diagnosis.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ateneo_server::notify::{ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier};
use ateneo_server::store::{
    CaseStore, CreditLedger, DebateStore, InMemoryCaseStore, InMemoryDebateStore,
    InMemoryProfileStore, ProfileStore, SqliteStore,
};
use ateneo_server::{routes, AppState, Config, GeminiOracle, SweepConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ateneo_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        model = %config.gemini_model,
        threshold_secs = config.sweep.expiry_threshold_secs,
        "Loaded configuration"
    );

    let oracle = GeminiOracle::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.gemini_timeout_secs),
    );

    let notifier: Box<dyn Notifier> = match SmtpConfig::from_env() {
        Some(smtp) => match SmtpNotifier::new(smtp) {
            Ok(sender) => Box::new(sender),
            Err(e) => {
                tracing::warn!(error = %e, "SMTP setup failed, using console notifier");
                Box::new(ConsoleNotifier::new())
            }
        },
        None => Box::new(ConsoleNotifier::new()),
    };

    // Build the app over SQLite or in-memory storage
    let app = match &config.database {
        Some(path) => {
            tracing::info!(path = %path, "Using SQLite storage");
            let store = Arc::new(SqliteStore::open(path)?);
            build_app(
                store.clone(),
                store.clone(),
                store,
                oracle,
                notifier,
                config.sweep,
            )
        }
        None => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            build_app(
                Arc::new(InMemoryProfileStore::new()),
                Arc::new(InMemoryCaseStore::new()),
                Arc::new(InMemoryDebateStore::new()),
                oracle,
                notifier,
                config.sweep,
            )
        }
    };

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Ateneo server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble state, spawn the background sweeper and build the router
fn build_app<P, C, D>(
    profiles: P,
    cases: C,
    debates: D,
    oracle: GeminiOracle,
    notifier: Box<dyn Notifier>,
    sweep: SweepConfig,
) -> Router
where
    P: ProfileStore + CreditLedger + Clone + 'static,
    C: CaseStore + Clone + 'static,
    D: DebateStore + Clone + 'static,
{
    let state = Arc::new(AppState::new(
        profiles, cases, debates, oracle, notifier, sweep,
    ));
    tokio::spawn(state.sweeper.clone().run());
    routes::create_router(state)
}
