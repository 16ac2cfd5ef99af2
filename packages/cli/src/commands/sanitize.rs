use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SanitizeArgs {
    /// Pasted markup to clean
    pub input: PathBuf,

    /// Import the result and print it as editor markup
    #[arg(long)]
    pub import: bool,
}

pub fn sanitize(args: SanitizeArgs, _cwd: &Path) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    println!("{}", clean(&source, args.import));
    Ok(())
}

fn clean(source: &str, import: bool) -> String {
    if import {
        let nodes = ontask_document::sanitize_fragment(source);
        ontask_document::Serializer::new().serialize_nodes(&nodes)
    } else {
        ontask_document::sanitize(source)
    }
}
