use anyhow::Result;
use serde::Serialize;

/// Problems found in one stored record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordProblems {
    pub index: usize,
    pub id: String,
    pub errors: Vec<String>,
}

/// Result of `schoolfix check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub path: String,
    pub total: usize,
    pub duplicates: Vec<String>,
    pub problems: Vec<RecordProblems>,
}

impl CheckReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.problems.is_empty()
    }
}

/// Pretty JSON to stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
