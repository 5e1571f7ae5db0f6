//! Show command - decrypt one credential by fuzzy name lookup.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use agilevault_core::Keychain;

use crate::output::create_table;

/// Exit code for a wrong master password.
pub const EXIT_WRONG_PASSWORD: u8 = 2;
/// Exit code when no stored name clears the fuzzy threshold.
pub const EXIT_NOT_FOUND: u8 = 3;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to the vault directory
    pub vault: PathBuf,

    /// Item name to look up
    pub name: String,

    /// Minimum fuzzy-match score (0-100, 100 = exact match)
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: u8,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print only the password
    #[arg(long, conflicts_with = "json")]
    pub password_only: bool,
}

/// JSON output format for the show command
#[derive(Serialize)]
struct ShowOutput<'a> {
    name: &'a str,
    kind: String,
    username: Option<&'a str>,
    password: Option<&'a str>,
}

#[instrument(level = "info", name = "cmd::show", skip_all, fields(name = %args.name))]
pub fn execute(args: &Args, password: &str) -> Result<ExitCode> {
    let mut keychain = Keychain::open(&args.vault)?;

    if !keychain.unlock(password) {
        eprintln!("error: wrong master password");
        return Ok(ExitCode::from(EXIT_WRONG_PASSWORD));
    }

    let Some(item) = keychain.item(&args.name, args.threshold)? else {
        eprintln!(
            "error: no item matches {:?} at threshold {}",
            args.name, args.threshold
        );
        return Ok(ExitCode::from(EXIT_NOT_FOUND));
    };

    if args.password_only {
        let Some(secret) = item.password() else {
            bail!("item {:?} has no password field", item.name());
        };
        println!("{secret}");
    } else if args.json {
        let output = ShowOutput {
            name: item.name(),
            kind: item.kind().to_string(),
            username: item.username(),
            password: item.password(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let mut table = create_table(vec!["Field", "Value"]);
        table.add_row(vec!["name", item.name()]);
        table.add_row(vec!["username", item.username().unwrap_or("-")]);
        table.add_row(vec!["password", item.password().unwrap_or("-")]);
        println!("{table}");
    }
    Ok(ExitCode::SUCCESS)
}
