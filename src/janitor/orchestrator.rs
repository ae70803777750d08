//! Startup orchestration of the three janitors
//!
//! Fixed order: temp files first (cheapest, least consequential), session
//! keys next, store capping last (most expensive). Each janitor failure is
//! caught and logged here; maintenance never blocks application startup.

use crate::config::MaintenanceConfig;
use crate::janitor::{CapOutcome, SessionKeyJanitor, StoreCapper, TempFileJanitor};
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Aggregate outcome of one startup maintenance run
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceReport {
    pub temp_files_removed: usize,
    pub session_files_removed: usize,
    /// `None` when the store capper failed and was skipped over
    pub store: Option<CapOutcome>,
}

/// Runs the three janitors in sequence with per-janitor failure isolation
pub struct StartupOrchestrator {
    config: MaintenanceConfig,
}

impl StartupOrchestrator {
    pub fn new(config: MaintenanceConfig) -> Self {
        Self { config }
    }

    /// Runs one full maintenance pass. Never fails: every janitor error is
    /// caught, logged and skipped over, and the remaining janitors still run.
    pub async fn run_all(&self, now: DateTime<Utc>) -> MaintenanceReport {
        info!("Running startup storage maintenance...");
        let mut report = MaintenanceReport::default();

        report.temp_files_removed = TempFileJanitor::new(&self.config).run(now).await;

        match SessionKeyJanitor::new(&self.config).run(now).await {
            Ok(removed) => report.session_files_removed = removed,
            Err(e) => error!("Session cleanup error: {e}"),
        }

        match StoreCapper::new(&self.config).run().await {
            Ok(outcome) => report.store = Some(outcome),
            Err(e) => error!("Store cap error: {e}"),
        }

        info!("Startup maintenance complete.");
        report
    }
}

/// Single entry point for the embedding application: one maintenance pass
/// over the layout described by `config`, evaluated at instant `now`.
pub async fn run_startup_maintenance(
    config: MaintenanceConfig,
    now: DateTime<Utc>,
) -> MaintenanceReport {
    StartupOrchestrator::new(config).run_all(now).await
}
