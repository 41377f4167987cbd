//! Validation helpers for issue drafts, updates and stored records.
//!
//! These routines return every violated rule as a structured
//! `ValidationError` without touching storage.

use crate::error::ValidationError;
use crate::model::{Issue, IssueDraft};
use crate::query::IssueUpdate;
use crate::util::is_valid_id_format;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
pub const MAX_SHORT_TEXT_CHARS: usize = 200;
pub const MAX_IMAGE_URL_CHARS: usize = 2048;
pub const MAX_NOTE_CHARS: usize = 2000;

/// Validates issue fields and invariants.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate a submission before it becomes an issue.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_draft(draft: &IssueDraft) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_required(&mut errors, "title", &draft.title, MAX_TITLE_CHARS);
        check_required(
            &mut errors,
            "description",
            &draft.description,
            MAX_DESCRIPTION_CHARS,
        );
        check_optional(&mut errors, "reporterName", draft.reporter_name.as_deref(), MAX_SHORT_TEXT_CHARS);
        check_optional(
            &mut errors,
            "reporterContact",
            draft.reporter_contact.as_deref(),
            MAX_SHORT_TEXT_CHARS,
        );
        check_optional(&mut errors, "location", draft.location.as_deref(), MAX_SHORT_TEXT_CHARS);
        check_image_url(&mut errors, draft.image_url.as_deref());

        finish(errors)
    }

    /// Validate the fields an update would write.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_update(update: &IssueUpdate) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(ref title) = update.title {
            check_required(&mut errors, "title", title, MAX_TITLE_CHARS);
        }
        if let Some(ref description) = update.description {
            check_required(&mut errors, "description", description, MAX_DESCRIPTION_CHARS);
        }
        if let Some(ref name) = update.reporter_name {
            check_optional(&mut errors, "reporterName", name.as_deref(), MAX_SHORT_TEXT_CHARS);
        }
        if let Some(ref contact) = update.reporter_contact {
            check_optional(&mut errors, "reporterContact", contact.as_deref(), MAX_SHORT_TEXT_CHARS);
        }
        if let Some(ref location) = update.location {
            check_optional(&mut errors, "location", location.as_deref(), MAX_SHORT_TEXT_CHARS);
        }
        if let Some(ref url) = update.image_url {
            check_image_url(&mut errors, url.as_deref());
        }
        if let Some(ref note) = update.admin_note {
            check_optional(&mut errors, "adminNote", note.as_deref(), MAX_NOTE_CHARS);
        }

        finish(errors)
    }

    /// Validate a stored record.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_issue(issue: &Issue) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if issue.id.trim().is_empty() {
            errors.push(ValidationError::new("id", "cannot be empty"));
        } else if !is_valid_id_format(&issue.id) {
            errors.push(ValidationError::new(
                "id",
                "invalid format (expected ISS-<millis>-<suffix>)",
            ));
        }

        check_required(&mut errors, "title", &issue.title, MAX_TITLE_CHARS);
        check_required(
            &mut errors,
            "description",
            &issue.description,
            MAX_DESCRIPTION_CHARS,
        );
        check_optional(&mut errors, "adminNote", issue.admin_note.as_deref(), MAX_NOTE_CHARS);

        if issue.updated_at < issue.created_at {
            errors.push(ValidationError::new(
                "updatedAt",
                "cannot be before createdAt",
            ));
        }
        match issue.resolved_at {
            Some(resolved_at) if resolved_at < issue.created_at => {
                errors.push(ValidationError::new(
                    "resolvedAt",
                    "cannot be before createdAt",
                ));
            }
            None if issue.status.is_resolved() => {
                errors.push(ValidationError::new(
                    "resolvedAt",
                    "missing on a resolved issue",
                ));
            }
            _ => {}
        }

        finish(errors)
    }
}

fn check_required(errors: &mut Vec<ValidationError>, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "cannot be empty"));
    } else if value.chars().count() > max {
        errors.push(ValidationError::new(field, format!("exceeds {max} characters")));
    }
}

fn check_optional(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(ValidationError::new(field, format!("exceeds {max} characters")));
        }
    }
}

fn check_image_url(errors: &mut Vec<ValidationError>, url: Option<&str>) {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return;
    };
    if url.len() > MAX_IMAGE_URL_CHARS {
        errors.push(ValidationError::new(
            "imageUrl",
            format!("exceeds {MAX_IMAGE_URL_CHARS} characters"),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::new("imageUrl", "must be an http(s) URL"));
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
