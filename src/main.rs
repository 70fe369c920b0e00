//! Main entry point for the footfix CLI application.
//!
//! Copies a .docx file, normalizes the formatting of its footnotes and
//! prints a short summary.

use anyhow::{Context, Result};
use clap::Parser;

use footfix::{Cli, StylePolicy};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let policy = StylePolicy::default();
    let outcome = footfix::normalize_with(&cli.input, cli.output.as_deref(), &policy)
        .with_context(|| format!("failed to fix footnotes in {}", cli.input.display()))?;

    if cli.is_quiet() {
        return Ok(());
    }

    match outcome.stats {
        Some(stats) => {
            println!(
                "Processed {} footnotes ({} paragraphs, {} runs)",
                stats.footnotes, stats.paragraphs, stats.runs
            );
            println!("Footnote settings:");
            println!("{policy}");
        }
        None => println!("No footnotes found; document copied unchanged"),
    }
    println!("Written: {}", outcome.output.display());

    Ok(())
}
