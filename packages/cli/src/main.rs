mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, convert, labels, sanitize, CheckArgs, ConvertArgs, LabelsArgs, SanitizeArgs};
use tracing_subscriber::EnvFilter;

/// OnTask content tools - convert, check and inspect email/page markup
#[derive(Parser, Debug)]
#[command(name = "ontask-content")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log what the editor does while loading content
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load markup, normalize it and write it back out
    Convert(ConvertArgs),

    /// Report malformed markup and schema violations
    Check(CheckArgs),

    /// List condition branches with their labels
    Labels(LabelsArgs),

    /// Sanitize pasted markup
    Sanitize(SanitizeArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Convert(args) => convert(args, &cwd),
            Command::Check(args) => check(args, &cwd),
            Command::Labels(args) => labels(args, &cwd),
            Command::Sanitize(args) => sanitize(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
