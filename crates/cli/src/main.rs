use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod op;
mod ops;

use op::{Op, OpContext};

crate::command_enum! {
    (Init, ops::Init),
    (Cell, ops::Cell),
    (Box, ops::Boxes),
    (Mkcol, ops::Mkcol),
    (Put, ops::Put),
    (Get, ops::Get),
    (Ls, ops::Ls),
    (Rm, ops::Rm),
    (Mv, ops::Mv),
    (Proppatch, ops::Proppatch),
    (Acl, ops::Acl),
}

/// Manage a filesystem-backed tree of cells, boxes and WebDAV resources
#[derive(Parser, Debug)]
#[command(name = "cellbox", version, about)]
struct Cli {
    /// Path to the config file (defaults to ~/.cellbox/config.toml)
    #[arg(long, global = true, env = "CELLBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = OpContext::load(cli.config)?;
    let output = cli.command.execute(&ctx)?;
    println!("{output}");
    Ok(())
}
