//! Info command - key and item inventory without unlocking.

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
}

/// JSON output format for the info command
#[derive(Serialize)]
struct InfoOutput<'a> {
    keys: Vec<KeyInfo<'a>>,
    item_count: usize,
}

#[derive(Serialize)]
struct KeyInfo<'a> {
    identifier: &'a str,
    level: &'a str,
}

#[instrument(level = "info", name = "cmd::info", skip_all)]
pub fn execute(args: &Args) -> Result<()> {
    let keychain = Keychain::open(&args.vault)?;

    if args.json {
        let output = InfoOutput {
            keys: keychain
                .keys()
                .map(|key| KeyInfo {
                    identifier: key.identifier(),
                    level: key.level().as_str(),
                })
                .collect(),
            item_count: keychain.get_items().len(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let mut table = create_table(vec!["Key", "Level"]);
        for key in keychain.keys() {
            table.add_row(vec![key.identifier(), key.level().as_str()]);
        }
        println!("{table}");
        println!("{} item(s)", keychain.get_items().len());
    }
    Ok(())
}
