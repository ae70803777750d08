//! storekeeper - startup storage maintenance for a stateful messaging agent
//!
//! Three independent janitors (temp files, session-key files, store-document
//! capping) run once at process startup, each best-effort and failure
//! isolated, so disk usage stays bounded without ever blocking startup.

pub mod config;
pub mod janitor;
pub mod utils;

pub use config::MaintenanceConfig;
pub use janitor::{MaintenanceReport, run_startup_maintenance};
