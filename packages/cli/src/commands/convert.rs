use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ontask_editor::{Editor, RuleContext};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input markup file
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn convert(args: ConvertArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let html = normalize_markup(&source, &config);
    info!(input = %args.input.display(), bytes = html.len(), "Converted");

    match args.output {
        Some(output) => {
            fs::write(&output, &html).with_context(|| format!("Cannot write {}", output.display()))?;
            eprintln!("{} {} → {}", "✓".green(), args.input.display(), output.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

/// Markup as the editor would save it.
pub fn normalize_markup(source: &str, config: &Config) -> String {
    Editor::load(source, config.editor.clone(), RuleContext::default()).serialize()
}
