//! Shared application state

use std::sync::Arc;

use ateneo_core::CaseOracle;

use crate::engine::DebateEngine;
use crate::notify::Notifier;
use crate::store::{CaseStore, CreditLedger, DebateStore, ProfileStore};
use crate::sweeper::{SweepConfig, Sweeper};

/// State shared by every request handler
pub struct AppState<P, C, D, O> {
    /// Debate lifecycle orchestration
    pub engine: DebateEngine<P, C, D, O>,
    /// Direct profile access for the account surface
    pub profiles: P,
    /// Shared with the background task so on-demand sweeps reuse its
    /// alert dedup state
    pub sweeper: Arc<Sweeper<P, C, D, O>>,
}

impl<P, C, D, O> AppState<P, C, D, O>
where
    P: ProfileStore + CreditLedger + Clone,
    C: CaseStore + Clone,
    D: DebateStore + Clone,
    O: CaseOracle + Clone,
{
    pub fn new(
        profiles: P,
        cases: C,
        debates: D,
        oracle: O,
        notifier: Box<dyn Notifier>,
        sweep_config: SweepConfig,
    ) -> Self {
        let engine = DebateEngine::new(profiles.clone(), cases.clone(), debates.clone(), oracle);
        let sweeper = Arc::new(Sweeper::new(
            engine.clone(),
            debates,
            notifier,
            sweep_config,
        ));

        Self {
            engine,
            profiles,
            sweeper,
        }
    }
}
