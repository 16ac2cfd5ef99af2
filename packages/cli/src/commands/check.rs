use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use ontask_document::{deserialize, format_errors, parse_markup_strict, ParseErrors};
use ontask_editor::{validate, Violation};
use serde::Serialize;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input markup file or directory of .html files
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    Markup,
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Range<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<Violation>,
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    problems: Vec<Problem>,
}

/// What a strict parse and a schema validation found in one source.
#[derive(Debug, Default)]
pub struct Findings {
    pub markup: ParseErrors,
    pub violations: Vec<Violation>,
}

impl Findings {
    pub fn of(source: &str) -> Self {
        Self {
            markup: parse_markup_strict(source).err().unwrap_or_default(),
            violations: validate(&deserialize(source)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty() && self.violations.is_empty()
    }

    pub fn problems(&self) -> Vec<Problem> {
        let markup = self.markup.errors.iter().map(|error| Problem {
            kind: ProblemKind::Markup,
            message: error.to_string(),
            span: Some(error.span()),
            violation: None,
        });
        let schema = self.violations.iter().map(|violation| Problem {
            kind: ProblemKind::Schema,
            message: violation.to_string(),
            span: None,
            violation: Some(violation.clone()),
        });
        markup.chain(schema).collect()
    }
}

pub fn check(args: CheckArgs, _cwd: &Path) -> Result<()> {
    let text = args.format == Format::Text;
    if text {
        println!("🔍 {} OnTask content check", "Starting".green().bold());
        println!("   Input: {}", args.input.display());
        println!();
    }

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        let files = find_html_files(&args.input);
        if text {
            println!("   Found {} .html files", files.len());
            println!();
        }
        files
    } else {
        return Err(anyhow::anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut reports = Vec::new();
    for file in &files {
        let source = fs::read_to_string(file)?;
        let findings = Findings::of(&source);
        if text {
            print_findings(file, &source, &findings);
        }
        reports.push(FileReport { file: file.display().to_string(), problems: findings.problems() });
    }

    let total: usize = reports.iter().map(|report| report.problems.len()).sum();
    if text {
        println!();
        println!(
            "✨ {} Check complete!",
            if total > 0 { "Done".red().bold() } else { "Done".green().bold() }
        );
        println!("   Files checked: {}", files.len());
        if total == 0 {
            println!("   {} No issues found!", "✓".green());
        } else {
            println!("   {} {}", "Problems:".red(), total);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if total > 0 {
        anyhow::bail!("{} problem(s) found", total);
    }
    Ok(())
}

fn print_findings(file: &Path, source: &str, findings: &Findings) {
    if findings.is_empty() {
        println!("{} {}", "✓".green(), file.display());
        return;
    }

    println!("{}", file.display());
    if !findings.markup.is_empty() {
        eprintln!("{}", format_errors(source, &file.display().to_string(), &findings.markup));
    }
    for violation in &findings.violations {
        println!(
            "  {} [{}] at {}: {}",
            "error".red().bold(),
            violation.code,
            violation.path,
            violation.message
        );
    }
    println!();
}

fn find_html_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().map(|ext| ext == "html").unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontask_editor::ViolationCode;

    #[test]
    fn test_clean_markup() {
        let findings = Findings::of("<p>Hello <attribute>name</attribute></p>");
        assert!(findings.is_empty());
        assert!(findings.problems().is_empty());
    }

    #[test]
    fn test_unclosed_element() {
        let findings = Findings::of("<p>Hello <strong>there</p>");
        assert!(!findings.markup.is_empty());
        assert!(findings.problems().iter().any(|problem| problem.kind == ProblemKind::Markup));
    }

    #[test]
    fn test_schema_violation() {
        let findings = Findings::of("<rule ruleid=\"r\"><condition conditionid=\"c\" ruleid=\"r\"><p>a</p></condition></rule>");
        assert!(findings.markup.is_empty());
        let codes: Vec<ViolationCode> = findings.violations.iter().map(|violation| violation.code).collect();
        assert!(codes.contains(&ViolationCode::FirstChildTypeInvalid));
        assert!(codes.contains(&ViolationCode::LastChildTypeInvalid));
    }

    #[test]
    fn test_problems_serialize() {
        let problems = Findings::of("<li>a</li>").problems();
        let json = serde_json::to_value(&problems).unwrap();
        assert_eq!(json[0]["kind"], "schema");
        assert_eq!(json[0]["violation"]["code"], "parent_type_invalid");
    }
}
