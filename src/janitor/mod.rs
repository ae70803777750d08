//! Retention janitors and their startup orchestration
//!
//! Each janitor owns one resource class (temp files, session-key files, the
//! store document) and sweeps it best-effort: individual entry failures are
//! swallowed, the batch continues, and a single summary line is logged when
//! anything was removed.

pub mod orchestrator;
pub mod session;
pub mod store;
pub mod temp;

pub use orchestrator::{MaintenanceReport, StartupOrchestrator, run_startup_maintenance};
pub use session::{SessionFileKind, SessionKeyJanitor};
pub use store::{CapOutcome, StoreCapper, StoreDocument};
pub use temp::TempFileJanitor;

use chrono::{DateTime, Duration, Utc};
use std::time::SystemTime;

/// Returns `true` if a file last modified at `mtime` is strictly older than
/// `max_age` at instant `now`.
///
/// The comparison is `>`, not `>=`: a file whose age equals the limit exactly
/// is retained.
pub(crate) fn is_stale(now: DateTime<Utc>, mtime: SystemTime, max_age: Duration) -> bool {
    let modified: DateTime<Utc> = mtime.into();
    now.signed_duration_since(modified) > max_age
}
