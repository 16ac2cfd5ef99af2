use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use ontask_document::deserialize;
use ontask_editor::{condition_headings, RuleContext};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Input markup file
    pub input: PathBuf,

    /// Rule context exported by the rules engine (overrides the config)
    #[arg(short, long)]
    pub context: Option<PathBuf>,
}

pub fn labels(args: LabelsArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let context = config.rule_context(cwd, args.context.as_deref())?;
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let lines = label_lines(&source, &context);
    if lines.is_empty() {
        println!("{} No condition branches in {}", "✓".green(), args.input.display());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// One line per condition branch: path, label and colour.
pub fn label_lines(source: &str, context: &RuleContext) -> Vec<String> {
    condition_headings(&deserialize(source), context)
        .into_iter()
        .map(|(path, heading)| {
            let label = if heading.catch_all {
                heading.label.dimmed().to_string()
            } else {
                heading.label.bold().to_string()
            };
            match heading.colour {
                Some(colour) => format!("{:<12} {} ({})", path.to_string(), label, colour),
                None => format!("{:<12} {}", path.to_string(), label),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_lines() {
        colored::control::set_override(false);
        let context = RuleContext::from_json(
            r##"{
                "rules": [{
                    "ruleId": "r1",
                    "catchAll": "c2",
                    "parameters": ["city"],
                    "conditions": [{ "conditionId": "c1", "formulas": [{ "operator": "==", "comparator": "Sydney" }] }]
                }],
                "colours": ["#ffc0cb"]
            }"##,
        )
        .unwrap();
        let source = "<p>a</p><rule ruleid=\"r1\">\
            <condition conditionid=\"c1\" ruleid=\"r1\"><p>b</p></condition>\
            <condition conditionid=\"c2\" ruleid=\"r1\" label=\"else\"><p>c</p></condition>\
            <condition conditionid=\"gone\" ruleid=\"r1\"><p>d</p></condition>\
            </rule><p>e</p>";

        let lines = label_lines(source, &context);
        assert_eq!(
            lines,
            vec![
                format!("{:<12} city = Sydney (#ffc0cb)", "[1, 0]"),
                format!("{:<12} else (#ffc0cb)", "[1, 1]"),
                format!("{:<12} MISSING_CONDITION", "[1, 2]"),
            ]
        );
    }
}
