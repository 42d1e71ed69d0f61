//! History command - list movements recorded on an account

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use reconcile_core::services::LoggingService;
use reconcile_core::TransactionType;

use super::get_context;
use crate::output;

pub fn run(logger: &Option<Arc<LoggingService>>, account: &str, limit: usize, json: bool) -> Result<()> {
    let context = get_context(logger.clone())?;
    let account = context.config.resolve_account(account);

    let runtime = tokio::runtime::Runtime::new()?;
    let mut movements = runtime.block_on(context.import_service.history(&account))?;
    movements.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&movements)?);
        return Ok(());
    }

    if movements.is_empty() {
        println!("No movements recorded for {}.", account);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Amount", "Origin", "Batch"]);
    for movement in &movements {
        let amount = output::format_amount(movement.amount);
        let amount = match movement.kind {
            TransactionType::Credit => Cell::new(amount).fg(Color::Green),
            TransactionType::Debit => Cell::new(format!("-{}", amount)).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(movement.date),
            Cell::new(&movement.description),
            amount,
            Cell::new(movement.origin.as_str()),
            Cell::new(movement.batch_id.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{}", account.bold());
    println!("{}", table);
    Ok(())
}
