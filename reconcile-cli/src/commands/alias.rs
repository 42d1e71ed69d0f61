//! Alias command - manage account aliases in settings.json

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use reconcile_core::config::Config;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum AliasCommands {
    /// Point an alias at an account id
    Set {
        /// Short name used with --account
        alias: String,
        /// Account id the alias resolves to
        account: String,
    },
    /// Remove an alias
    Remove {
        alias: String,
    },
    /// List configured aliases
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AliasCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let mut config = Config::load(&data_dir)?;

    match command {
        AliasCommands::Set { alias, account } => {
            config.set_alias(&alias, &account)?;
            config.save(&data_dir)?;
            output::success(&format!("{} -> {}", alias.trim(), account.trim()));
        }
        AliasCommands::Remove { alias } => {
            let account = config
                .remove_alias(&alias)
                .ok_or_else(|| anyhow!("No alias named '{}'", alias.trim()))?;
            config.save(&data_dir)?;
            println!("Removed {} (was {})", alias.trim().bold(), account);
        }
        AliasCommands::List { json } => {
            let aliases: BTreeMap<_, _> = config.account_aliases.iter().collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&aliases)?);
                return Ok(());
            }
            if aliases.is_empty() {
                println!("No aliases configured.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Alias", "Account"]);
            for (alias, account) in aliases {
                table.add_row(vec![alias.as_str(), account.as_str()]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
