//! `securefs` command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use securefs::cli::{self, Args};
use securefs::Jail;

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(args.output.log_level())
        .with_writer(std::io::stderr)
        .init();

    let jail = Jail::new(&args.root.root)
        .with_context(|| format!("Failed to open jail at {}", args.root.root.display()))?;

    cli::run(
        &jail,
        &args.command,
        &mut std::io::stdin().lock(),
        &mut std::io::stdout().lock(),
    )?;

    jail.close().context("Failed to close jail")?;
    Ok(())
}
