//! CLI subcommands.

pub mod info;
pub mod list;
pub mod show;
