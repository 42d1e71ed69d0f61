//! Preview command - parse a statement without writing anything

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use reconcile_core::services::LoggingService;

use super::get_context;
use crate::output;

pub fn run(logger: &Option<Arc<LoggingService>>, file: &Path, json: bool) -> Result<()> {
    let context = get_context(logger.clone())?;
    let batch = context.preview_file(file)?;
    let totals = batch.totals();

    if json {
        let value = serde_json::json!({
            "batch": batch,
            "totals": totals,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if batch.is_empty() {
        output::warning("Header found but the statement has no data rows.");
        return Ok(());
    }

    output::print_batch(&batch);
    output::print_totals(&batch, &totals);
    Ok(())
}
