//! List command implementation.

use anyhow::Result;
use schoolfix_lib::store::file;
use schoolfix_lib::{Category, ListFilters, Priority, SortOrder, Status};
use tracing::debug;

use crate::cli::ListArgs;
use crate::config::Config;
use crate::format::{format_issue_line, print_json};

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if a filter value is invalid or the data file is unreadable.
pub fn execute(args: &ListArgs, config: &Config, json: bool) -> Result<()> {
    let filters = build_filters(args)?;
    let issues = file::load(&config.data_file)?;
    debug!(total = issues.len(), "loaded issues");
    let issues = filters.apply(issues);

    if json {
        return print_json(&issues);
    }

    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    for issue in &issues {
        println!("{}", format_issue_line(issue));
    }
    println!("\n{} issue(s)", issues.len());
    Ok(())
}

/// Convert CLI arguments to store filters.
///
/// # Errors
///
/// Returns an error if a status, category, priority or sort value does not parse.
pub fn build_filters(args: &ListArgs) -> Result<ListFilters> {
    Ok(ListFilters {
        status: given(args.status.as_deref())
            .map(str::parse::<Status>)
            .transpose()?,
        category: given(args.category.as_deref())
            .map(str::parse::<Category>)
            .transpose()?,
        priority: given(args.priority.as_deref())
            .map(str::parse::<Priority>)
            .transpose()?,
        search: given(args.search.as_deref()).map(str::to_string),
        sort: given(args.sort.as_deref())
            .map(str::parse::<SortOrder>)
            .transpose()?,
        limit: args.limit,
    })
}

fn given(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}
