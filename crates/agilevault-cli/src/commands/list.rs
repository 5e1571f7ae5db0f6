//! List command - show the items stored in a vault.
//!
//! # Examples
//!
//! ```bash
//! # Table of names and kinds
//! agilevault list ~/vault.agilekeychain
//!
//! # One name per line (script-friendly)
//! agilevault list -1 ~/vault.agilekeychain
//!
//! # JSON for scripting
//! agilevault list --json ~/vault.agilekeychain | jq '.items[].name'
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use agilevault_core::Keychain;

use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to the vault directory
    pub vault: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// One name per line (script-friendly)
    #[arg(short = '1')]
    pub one_per_line: bool,
}

/// JSON output format for the list command
#[derive(Serialize)]
struct ListOutput<'a> {
    items: Vec<ItemInfo<'a>>,
}

#[derive(Serialize)]
struct ItemInfo<'a> {
    name: &'a str,
    kind: String,
    identifier: &'a str,
}

#[instrument(level = "info", name = "cmd::list", skip_all)]
pub fn execute(args: &Args) -> Result<()> {
    let keychain = Keychain::open(&args.vault)?;

    if args.json {
        let output = ListOutput {
            items: keychain
                .items()
                .map(|item| ItemInfo {
                    name: item.name(),
                    kind: item.kind().to_string(),
                    identifier: item.identifier(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.one_per_line {
        for name in keychain.get_items() {
            println!("{name}");
        }
    } else {
        let mut table = create_table(vec!["Name", "Kind"]);
        for item in keychain.items() {
            table.add_row(vec![item.name().to_string(), item.kind().to_string()]);
        }
        println!("{table}");
    }
    Ok(())
}
