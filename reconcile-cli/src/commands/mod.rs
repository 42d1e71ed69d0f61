//! CLI command implementations

pub mod alias;
pub mod detect;
pub mod history;
pub mod import;
pub mod logs;
pub mod preview;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use reconcile_core::services::{EntryPoint, LogEvent, LoggingService};
use reconcile_core::ReconcileContext;

/// Data directory from `RECONCILE_DIR`, else `~/.reconcile`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RECONCILE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".reconcile"))
        .ok_or_else(|| anyhow!("Could not find home directory; set RECONCILE_DIR"))
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Open the ledger and wire the import service to the logger
pub fn get_context(logger: Option<Arc<LoggingService>>) -> Result<ReconcileContext> {
    let data_dir = get_data_dir()?;
    ReconcileContext::new(&data_dir, logger)
        .with_context(|| format!("Failed to open ledger in {}", data_dir.display()))
}
