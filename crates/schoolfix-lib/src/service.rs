//! Issue lifecycle rules and derived aggregates.
//!
//! Everything here is pure: stores call these functions so that every backend
//! assigns identity, stamps timestamps and tracks `resolvedAt` the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::model::{Issue, IssueDraft, Priority, Status};
use crate::query::IssueUpdate;
use crate::validation::IssueValidator;

/// Build a new issue from a validated draft.
///
/// The status is always `pending` and `createdAt == updatedAt == now`.
///
/// # Errors
///
/// Returns `Validation`/`ValidationErrors` if the draft is invalid.
pub fn new_issue(draft: IssueDraft, id: String, now: DateTime<Utc>) -> Result<Issue> {
    IssueValidator::validate_draft(&draft).map_err(StoreError::from_validation_errors)?;

    Ok(Issue {
        id,
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        category: draft.category,
        priority: draft.priority,
        status: Status::Pending,
        reporter_name: normalize(draft.reporter_name),
        reporter_contact: normalize(draft.reporter_contact),
        location: normalize(draft.location),
        image_url: normalize(draft.image_url),
        created_at: now,
        updated_at: now,
        resolved_at: None,
        admin_note: None,
    })
}

/// Merge an update into an existing issue.
///
/// `updatedAt` is refreshed even when the update carries no fields and
/// never moves backwards, even when `now` lags behind the stored value.
/// `resolvedAt` is stamped the first time the issue becomes `resolved`
/// and is left alone afterwards, whatever the status does later.
///
/// # Errors
///
/// Returns `Validation`/`ValidationErrors` if the update is invalid;
/// the issue is left untouched in that case.
pub fn apply_update(issue: &mut Issue, update: &IssueUpdate, now: DateTime<Utc>) -> Result<()> {
    IssueValidator::validate_update(update).map_err(StoreError::from_validation_errors)?;

    // A writer with a lagging clock must not move timestamps backwards.
    let stamp = now.max(issue.updated_at).max(issue.created_at);

    if let Some(ref title) = update.title {
        issue.title = title.trim().to_string();
    }
    if let Some(ref description) = update.description {
        issue.description = description.trim().to_string();
    }
    if let Some(category) = update.category {
        issue.category = category;
    }
    if let Some(priority) = update.priority {
        issue.priority = priority;
    }
    if let Some(status) = update.status {
        issue.status = status;
        if status.is_resolved() && issue.resolved_at.is_none() {
            issue.resolved_at = Some(stamp);
        }
    }
    if let Some(ref name) = update.reporter_name {
        issue.reporter_name = normalize(name.clone());
    }
    if let Some(ref contact) = update.reporter_contact {
        issue.reporter_contact = normalize(contact.clone());
    }
    if let Some(ref location) = update.location {
        issue.location = normalize(location.clone());
    }
    if let Some(ref url) = update.image_url {
        issue.image_url = normalize(url.clone());
    }
    if let Some(ref note) = update.admin_note {
        issue.admin_note = normalize(note.clone());
    }

    issue.updated_at = stamp;
    Ok(())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub inprogress: usize,
    pub resolved: usize,
}

/// Counts by status and by priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
    #[serde(flatten)]
    pub status: StatusCounts,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl IssueStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.status.total
    }
}

/// Reduce a collection to status counts.
#[must_use]
pub fn status_counts(issues: &[Issue]) -> StatusCounts {
    issues
        .iter()
        .fold(StatusCounts::default(), |mut counts, issue| {
            counts.total += 1;
            match issue.status {
                Status::Pending => counts.pending += 1,
                Status::InProgress => counts.inprogress += 1,
                Status::Resolved => counts.resolved += 1,
            }
            counts
        })
}

/// Reduce a collection to status and priority counts.
#[must_use]
pub fn stats(issues: &[Issue]) -> IssueStats {
    let mut stats = IssueStats {
        status: status_counts(issues),
        ..Default::default()
    };
    for issue in issues {
        match issue.priority {
            Priority::High => stats.high += 1,
            Priority::Medium => stats.medium += 1,
            Priority::Low => stats.low += 1,
        }
    }
    stats
}
