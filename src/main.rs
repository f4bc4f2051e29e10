//! # glmirror
//!
//! **glmirror** mirrors GitLab groups and projects to local disk.
//!
//! Features:
//! - `glmirror sync` walks the given groups (recursively) and projects and
//!   clones or force-updates every repository under `--dest-dir`
//! - `glmirror plan` shows where every repository would go, without git
//! - `glmirror config-path` prints the default config file location
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use glmirror::{MirrorArgs, cmd_plan, cmd_sync, default_config_file, init_logging};

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "glmirror",
    version,
    about = "glmirror - mirror GitLab groups and projects to local disk",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Clone or update every repository below the given groups/projects
    Sync(MirrorArgs),
    /// Print every destination without cloning or updating anything
    Plan(MirrorArgs),
    /// Print the default config file path
    ConfigPath,
}

/// CLI entry point.
///
/// Parses arguments with `clap`, sets up logging and executes the selected
/// subcommand. Only startup failures make the process exit non-zero.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    match cli.cmd {
        Cmd::Sync(args) => cmd_sync(&args).map(drop),
        Cmd::Plan(args) => cmd_plan(&args).map(drop),
        Cmd::ConfigPath => {
            println!("{}", default_config_file().display());
            Ok(())
        }
    }
}
