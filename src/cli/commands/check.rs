//! Check command implementation.
//!
//! Reads the data file and validates every stored record.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use schoolfix_lib::Issue;
use schoolfix_lib::store::file;
use schoolfix_lib::validation::IssueValidator;
use tracing::{info, warn};

use crate::config::Config;
use crate::format::{CheckReport, RecordProblems, print_json};

/// Execute the check command.
///
/// # Errors
///
/// Returns an error if the data file is unreadable or any problem is found.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let path = &config.data_file;
    let issues = file::load(path).with_context(|| format!("Cannot check {}", path.display()))?;
    let report = build_report(path, &issues);

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if report.is_clean() {
        info!(total = report.total, "data file is clean");
        Ok(())
    } else {
        let count = report.duplicates.len() + report.problems.len();
        warn!(count, "data file has problems");
        bail!("{count} problem(s) found in {}", path.display());
    }
}

#[must_use]
pub fn build_report(path: &Path, issues: &[Issue]) -> CheckReport {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut problems = Vec::new();

    for (index, issue) in issues.iter().enumerate() {
        let repeated = !issue.id.is_empty() && !seen.insert(issue.id.as_str());
        if repeated && !duplicates.contains(&issue.id) {
            duplicates.push(issue.id.clone());
        }
        if let Err(errors) = IssueValidator::validate_issue(issue) {
            problems.push(RecordProblems {
                index,
                id: issue.id.clone(),
                errors: errors.iter().map(ToString::to_string).collect(),
            });
        }
    }

    CheckReport {
        path: path.display().to_string(),
        total: issues.len(),
        duplicates,
        problems,
    }
}

fn print_report(report: &CheckReport) {
    println!("Checked {} issue(s) in {}", report.total, report.path);
    for id in &report.duplicates {
        println!("  duplicate id: {id}");
    }
    for problem in &report.problems {
        let label = if problem.id.is_empty() {
            format!("#{}", problem.index)
        } else {
            problem.id.clone()
        };
        for error in &problem.errors {
            println!("  {label}: {error}");
        }
    }
    if report.is_clean() {
        println!("No problems found.");
    }
}
