//! Output formatting for `schoolfix`.
//!
//! Supports both human-readable text output and machine-parseable JSON
//! (`--json`). Diagnostics always go to stderr through `tracing`.

mod output;
mod text;

pub use output::{CheckReport, RecordProblems, print_json};
pub use text::{
    format_issue_line, format_priority, format_stats, format_status_icon, truncate_to_width,
};
