//! Detect command - show which layout a statement file matches

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use reconcile_core::adapters::table_file::read_table;
use reconcile_core::domain::ColumnMap;
use reconcile_core::services::LoggingService;

use super::get_context;
use crate::output;

fn column_rows(columns: &ColumnMap) -> Vec<(&'static str, Option<usize>)> {
    vec![
        ("date", Some(columns.date)),
        ("description", Some(columns.description)),
        ("credit", columns.credit),
        ("debit", columns.debit),
        ("type", columns.kind),
        ("amount", columns.amount),
    ]
}

pub fn run(logger: &Option<Arc<LoggingService>>, file: &Path, json: bool) -> Result<()> {
    let context = get_context(logger.clone())?;
    let rows = read_table(file)?;
    let detected = context.import_service.detect(&rows)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detected)?);
        return Ok(());
    }

    println!("{} {}", "Layout:".bold(), detected.spec.kind.as_str().green());
    println!("{} {}", "Header row:".bold(), detected.header_index + 1);

    let mut table = output::create_table();
    table.set_header(vec!["Field", "Column"]);
    for (field, column) in column_rows(&detected.spec.columns) {
        if let Some(column) = column {
            table.add_row(vec![field.to_string(), (column + 1).to_string()]);
        }
    }
    println!("{}", table);

    Ok(())
}
