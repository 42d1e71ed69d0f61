//! Import command - parse a statement and commit it to an account

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use colored::Colorize;
use dialoguer::Confirm;
use reconcile_core::services::LoggingService;
use reconcile_core::{CommitMode, OperationResult};

use super::get_context;
use crate::output;

/// Flags for `rcn import`
pub struct ImportArgs {
    pub file: PathBuf,
    pub account: String,
    pub strict: bool,
    pub allow_duplicates: bool,
    pub sequential: bool,
    /// 1-based row positions as printed by `rcn preview`
    pub deselect: Vec<usize>,
    pub yes: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub fn run(logger: &Option<Arc<LoggingService>>, args: ImportArgs) -> Result<()> {
    let context = get_context(logger.clone())?;
    let mut batch = context.preview_file(&args.file)?;

    for position in &args.deselect {
        let index = position
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Row positions start at 1"))?;
        batch.set_selected(index, false)?;
    }

    let mut options = context.config.import_options(&args.account);
    if args.strict {
        options.allow_duplicates = false;
    }
    if args.allow_duplicates {
        options.allow_duplicates = true;
    }
    if args.sequential {
        options.commit_mode = CommitMode::Sequential;
    }

    let totals = batch.totals();

    if args.dry_run {
        if args.json {
            let value = serde_json::json!({
                "dryRun": true,
                "account": options.account,
                "strict": !options.allow_duplicates,
                "commitMode": options.commit_mode,
                "totals": totals,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            output::print_batch(&batch);
            output::print_totals(&batch, &totals);
            output::info("Dry run: nothing was written.");
        }
        return Ok(());
    }

    if totals.selected == 0 {
        if args.json {
            println!("{}", serde_json::json!({ "inserted": 0, "selected": 0 }));
        } else {
            output::warning("No valid rows selected; nothing to import.");
        }
        return Ok(());
    }

    let interactive = !args.yes && !args.json && atty::is(atty::Stream::Stdin);
    if interactive {
        output::print_batch(&batch);
        output::print_totals(&batch, &totals);

        let mode = if options.allow_duplicates { "permissive" } else { "strict" };
        if !Confirm::new()
            .with_prompt(format!(
                "Import {} rows into {} ({} dedup)?",
                totals.selected, options.account, mode
            ))
            .default(true)
            .interact()?
        {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(context.import_service.commit(&batch, &options))?;

    if args.json {
        let mut envelope = OperationResult::ok(&report)
            .with_context("commitMode", serde_json::json!(options.commit_mode));
        if let Some(err) = &report.commit.error {
            envelope.success = false;
            envelope.error = Some(err.clone());
        }
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        output::print_report(&report);
    }

    match &report.commit.error {
        None => {
            if !args.json {
                output::success(&format!(
                    "Imported {} movements into {}",
                    report.commit.inserted, report.account
                ));
            }
            Ok(())
        }
        Some(err) => {
            if !args.json && report.commit.inserted > 0 {
                println!(
                    "{}",
                    format!(
                        "{} movements were written before the failure and remain in the ledger.",
                        report.commit.inserted
                    )
                    .yellow()
                );
            }
            Err(anyhow!("Import failed: {}", err))
        }
    }
}
