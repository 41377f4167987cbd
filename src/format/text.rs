//! Text formatting functions for `schoolfix`.
//!
//! Provides plain text (non-ANSI) formatting for terminal output:
//! - Status icons (○ ◐ ✓)
//! - Priority badges ([high], [medium], [low])
//! - Issue line and stats formatting

use schoolfix_lib::{Issue, IssueStats, Priority, Status};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Status icon characters.
pub mod icons {
    /// Pending - waiting for triage (hollow circle).
    pub const PENDING: &str = "○";
    /// In progress - being fixed (half-filled).
    pub const IN_PROGRESS: &str = "◐";
    /// Resolved - fixed (checkmark).
    pub const RESOLVED: &str = "✓";
}

/// Widest title shown on a single issue line, in terminal columns.
pub const TITLE_COLUMNS: usize = 48;

#[must_use]
pub const fn format_status_icon(status: Status) -> &'static str {
    match status {
        Status::Pending => icons::PENDING,
        Status::InProgress => icons::IN_PROGRESS,
        Status::Resolved => icons::RESOLVED,
    }
}

/// Format priority as "[high]", "[medium]" or "[low]".
#[must_use]
pub fn format_priority(priority: Priority) -> String {
    format!("[{}]", priority.as_str())
}

/// Truncate to `max` terminal columns, ending with `…` when cut.
///
/// Thai combining marks are zero-width, so columns are not characters.
#[must_use]
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// Format a single-line issue summary.
///
/// Format: `{icon} {id} [{priority}] {category}: {title}`
#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    let mut line = format!(
        "{} {} {} {}: {}",
        format_status_icon(issue.status),
        issue.id,
        format_priority(issue.priority),
        issue.category.label(),
        truncate_to_width(&issue.title, TITLE_COLUMNS),
    );
    if let Some(ref location) = issue.location {
        line.push_str(&format!(" @ {location}"));
    }
    line
}

/// Multi-line stats summary.
#[must_use]
pub fn format_stats(stats: &IssueStats) -> String {
    format!(
        "Total: {}\n  {} pending: {}\n  {} in progress: {}\n  {} resolved: {}\nPriority: high {} / medium {} / low {}",
        stats.total(),
        icons::PENDING,
        stats.status.pending,
        icons::IN_PROGRESS,
        stats.status.inprogress,
        icons::RESOLVED,
        stats.status.resolved,
        stats.high,
        stats.medium,
        stats.low,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolfix_lib::Category;

    fn make_test_issue() -> Issue {
        Issue {
            id: "ISS-1718000000000-K3Z9Q".to_string(),
            title: "Broken window".to_string(),
            description: "Room 3".to_string(),
            category: Category::Building,
            priority: Priority::High,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_icons() {
        assert_eq!(format_status_icon(Status::Pending), "○");
        assert_eq!(format_status_icon(Status::InProgress), "◐");
        assert_eq!(format_status_icon(Status::Resolved), "✓");
    }

    #[test]
    fn test_format_issue_line() {
        let mut issue = make_test_issue();
        let line = format_issue_line(&issue);
        assert_eq!(
            line,
            format!(
                "○ ISS-1718000000000-K3Z9Q [high] {}: Broken window",
                Category::Building.label()
            )
        );

        issue.status = Status::Resolved;
        issue.location = Some("Building A".to_string());
        let line = format_issue_line(&issue);
        assert!(line.starts_with('✓'));
        assert!(line.ends_with("@ Building A"));
    }

    #[test]
    fn test_truncate_counts_columns() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        // Wide CJK glyphs take two columns each.
        assert_eq!(truncate_to_width("漢字漢字漢字", 5), "漢字…");
    }

    #[test]
    fn test_format_stats() {
        let stats = IssueStats::default();
        let text = format_stats(&stats);
        assert!(text.starts_with("Total: 0"));
        assert!(text.contains("high 0 / medium 0 / low 0"));
    }
}
