//! Reconcile CLI - bank statement import in your terminal

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reconcile_core::services::{LogEvent, LoggingService};

mod commands;
mod output;

use commands::{alias, detect, history, import, logs, preview};

/// Reconcile - import bank and processor statements into a ledger
#[derive(Parser)]
#[command(name = "rcn", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which statement layout a file matches
    Detect {
        /// Statement file (csv, txt, xlsx, xls, ods)
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a statement and show every row without importing
    Preview {
        /// Statement file (csv, txt, xlsx, xls, ods)
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a statement into an account
    Import {
        /// Statement file (csv, txt, xlsx, xls, ods)
        file: PathBuf,
        /// Account id or alias to import into
        #[arg(long, short)]
        account: String,
        /// Skip rows already recorded on the account
        #[arg(long, conflicts_with = "allow_duplicates")]
        strict: bool,
        /// Record every row even if it repeats (overrides settings)
        #[arg(long)]
        allow_duplicates: bool,
        /// Insert rows one at a time, keeping rows written before a failure
        #[arg(long)]
        sequential: bool,
        /// Row positions to leave out (as numbered by preview)
        #[arg(long, value_delimiter = ',')]
        deselect: Vec<usize>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Preview the selection without writing
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List movements recorded on an account
    History {
        /// Account id or alias
        #[arg(long, short)]
        account: String,
        /// Number of movements to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage account aliases
    Alias {
        #[command(subcommand)]
        command: alias::AliasCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Detect { .. } => "detect",
            Commands::Preview { .. } => "preview",
            Commands::Import { .. } => "import",
            Commands::History { .. } => "history",
            Commands::Alias { .. } => "alias",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = commands::get_logger();
    let name = cli.command.name();
    commands::log_event(&logger, LogEvent::new("command_executed").with_command(name));

    let result = run(cli, &logger);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string()),
            );
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    match cli.command {
        Commands::Detect { file, json } => detect::run(logger, &file, json),
        Commands::Preview { file, json } => preview::run(logger, &file, json),
        Commands::Import {
            file,
            account,
            strict,
            allow_duplicates,
            sequential,
            deselect,
            yes,
            dry_run,
            json,
        } => import::run(logger, import::ImportArgs {
            file,
            account,
            strict,
            allow_duplicates,
            sequential,
            deselect,
            yes,
            dry_run,
            json,
        }),
        Commands::History { account, limit, json } => history::run(logger, &account, limit, json),
        Commands::Alias { command } => alias::run(command),
        Commands::Logs { command } => logs::run(logger, command),
    }
}
