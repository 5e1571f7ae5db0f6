#![deny(unsafe_code)]

mod commands;
mod output;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{info, list, show};

/// Command-line interface for legacy AgileKeychain password vaults
#[derive(Parser)]
#[command(name = "agilevault")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List items in a vault
    agilevault list ~/vault.agilekeychain

    # Look up a credential with fuzzy matching
    agilevault show ~/vault.agilekeychain github --threshold 70

    # Pipe the master password from a secret manager
    echo \"$SECRET\" | agilevault --password-stdin show ~/vault.agilekeychain github
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Vault master password (insecure, prefer --password-stdin or AGILEVAULT_PASSWORD)
    #[arg(long, env = "AGILEVAULT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Read the master password from stdin (single line)
    #[arg(long, conflicts_with = "password", global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the items stored in a vault
    List(list::Args),

    /// Decrypt and print one credential
    Show(show::Args),

    /// Show the vault's key and item inventory
    Info(info::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::List(args) => list::execute(args).map(|()| ExitCode::SUCCESS),
        Commands::Info(args) => info::execute(args).map(|()| ExitCode::SUCCESS),
        Commands::Show(args) => {
            let password = read_password(cli)?;
            show::execute(args, &password)
        }
    }
}

/// Resolve the master password from flag, stdin, or an interactive prompt.
fn read_password(cli: &Cli) -> Result<String> {
    if let Some(password) = &cli.password {
        return Ok(password.clone());
    }
    if cli.password_stdin {
        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .context("failed to read password from stdin")?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_owned());
    }
    if io::stdin().is_terminal() {
        return rpassword::prompt_password("Master password: ")
            .context("failed to read password");
    }
    bail!("no password provided; use --password-stdin or AGILEVAULT_PASSWORD");
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
