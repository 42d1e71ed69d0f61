//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use reconcile_core::domain::BatchTotals;
use reconcile_core::{ImportBatch, ImportReport, ParsedRow, TransactionType};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Two decimal places, no currency symbol
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn row_status(row: &ParsedRow) -> Cell {
    match (&row.validation_error, row.is_selected) {
        (Some(issue), _) => Cell::new(issue.message()).fg(Color::Red),
        (None, true) => Cell::new("selected").fg(Color::Green),
        (None, false) => Cell::new("skipped").fg(Color::Yellow),
    }
}

/// Render every row of a batch; `#` is the position used by `--deselect`
pub fn print_batch(batch: &ImportBatch) {
    let mut table = create_table();
    table.set_header(vec!["#", "Line", "Date", "Description", "Type", "Amount", "Status"]);

    for (position, row) in batch.rows().iter().enumerate() {
        let kind = match row.transaction_type {
            Some(TransactionType::Credit) => Cell::new("CREDIT").fg(Color::Green),
            Some(TransactionType::Debit) => Cell::new("DEBIT").fg(Color::Red),
            None => Cell::new("-"),
        };

        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(row.source_index + 1),
            Cell::new(row.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(row.description.as_deref().unwrap_or("-")),
            kind,
            Cell::new(row.amount.map(format_amount).unwrap_or_else(|| "-".to_string())),
            row_status(row),
        ]);
    }

    println!("{}", table);
}

pub fn print_totals(batch: &ImportBatch, totals: &BatchTotals) {
    println!(
        "{} layout, {} rows ({} valid, {} invalid, {} blank skipped)",
        batch.format().kind.as_str().bold(),
        batch.len(),
        batch.valid_count(),
        batch.invalid_count(),
        batch.blank_rows()
    );
    println!(
        "Selected: {}  Credits: {}  Debits: {}  Net: {}",
        totals.selected.to_string().bold(),
        format_amount(totals.credits).green(),
        format_amount(totals.debits).red(),
        format_amount(totals.net()).bold()
    );
}

pub fn print_report(report: &ImportReport) {
    let commit = &report.commit;
    println!("Batch: {}", report.batch_id.dimmed());
    println!("  Account: {}", report.account);
    println!("  Origin: {}", report.origin.as_str());
    println!("  Selected: {}", report.selected);
    println!("  Inserted: {}", commit.inserted.to_string().green());
    if report.total_duplicates() > 0 {
        println!(
            "  Duplicates skipped: {} ({} before commit, {} by the ledger)",
            report.total_duplicates().to_string().yellow(),
            report.deduplicated,
            commit.duplicates_skipped
        );
    }
}
