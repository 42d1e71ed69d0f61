//! Logs command - view and manage application logs

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use reconcile_core::services::{LogEntry, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30", conflicts_with = "all")]
        older_than_days: u32,
        /// Delete every entry
        #[arg(long)]
        all: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn context_of(entry: &LogEntry) -> String {
    [entry.command.as_deref(), entry.layout.as_deref()]
        .iter()
        .filter_map(|&s| s)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run(logger: &Option<Arc<LoggingService>>, command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    let service = logger
        .as_deref()
        .ok_or_else(|| anyhow!("Could not open the log database in {}", data_dir.display()))?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);

            for entry in &entries {
                let error_indicator = if entry.error_message.is_some() {
                    "!".red().to_string()
                } else {
                    String::new()
                };

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    context_of(entry),
                    error_indicator,
                ]);
            }

            println!("{}", table);

            if !errors {
                let recent_errors = service.get_errors(3)?;
                if !recent_errors.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in &recent_errors {
                        println!(
                            "  {} [{}]: {}",
                            format_timestamp(err.timestamp).dimmed(),
                            err.event,
                            err.error_message.as_deref().unwrap_or("Unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            all,
            force,
            json,
        } => {
            let prompt = if all {
                "Delete all log entries?".to_string()
            } else {
                format!("Delete logs older than {} days?", older_than_days)
            };

            if !force && !json && !Confirm::new().with_prompt(prompt).default(false).interact()? {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = if all {
                service.clear()?
            } else {
                let cutoff = Utc::now()
                    .checked_sub_signed(Duration::days(i64::from(older_than_days)))
                    .ok_or_else(|| anyhow!("--older-than-days is out of range"))?;
                service.delete_before(cutoff.timestamp_millis())?
            };

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let counts = service.event_counts()?;
            let errors = service.get_errors(1000)?.len();
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "error_count": errors,
                        "events": counts,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", total);
            println!("  Errors: {}", errors);
            println!("  Database: {}", db_path.display());
            println!("  Size: {} bytes", size_bytes);

            if !counts.is_empty() {
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count"]);
                for count in &counts {
                    table.add_row(vec![count.event.clone(), count.count.to_string()]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}
