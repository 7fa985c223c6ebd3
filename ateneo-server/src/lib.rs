//! Ateneo case debate server
//!
//! Volunteers upload anonymized clinical cases, an AI collaborator
//! writes a preliminary report for each, and professionals spend
//! credits to claim a case and debate the AI by refuting its diagnosis.
//! Abandoned debates are released back into the pool by a background
//! sweeper.

pub mod config;
pub mod engine;
pub mod error;
pub mod gemini;
pub mod ids;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweeper;

pub use config::Config;
pub use engine::DebateEngine;
pub use error::ApiError;
pub use gemini::GeminiOracle;
pub use notify::{ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier};
pub use state::AppState;
pub use store::{
    InMemoryCaseStore, InMemoryDebateStore, InMemoryProfileStore, SqliteStore,
};
pub use sweeper::{SweepConfig, Sweeper};
