//! Partial-update and list-filter types for issue operations.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;
use crate::model::{Category, Issue, Priority, Status};

/// Maps a present JSON value (including `null`) to `Some`, so that
/// `Option<Option<T>>` can tell "absent" from "cleared".
#[allow(clippy::option_option)]
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Fields to update on an issue.
///
/// Outer `None` keeps the current value. For optional text fields,
/// `Some(None)` clears the value. Identity and timestamps are not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct IssueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub reporter_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub reporter_contact: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub admin_note: Option<Option<String>>,
}

impl IssueUpdate {
    /// Update that only changes the status.
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Update that only sets the administrator note.
    #[must_use]
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            admin_note: Some(Some(note.into())),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.reporter_name.is_none()
            && self.reporter_contact.is_none()
            && self.location.is_none()
            && self.image_url.is_none()
            && self.admin_note.is_none()
    }
}

/// Ordering applied to a filtered list.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// createdAt descending.
    #[default]
    Newest,
    /// createdAt ascending.
    Oldest,
    /// high, medium, low; ties keep their relative order.
    Priority,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Priority => "priority",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "new" | "created_desc" => Ok(Self::Newest),
            "oldest" | "old" | "created_asc" => Ok(Self::Oldest),
            "priority" => Ok(Self::Priority),
            other => Err(StoreError::validation(
                "sort",
                format!("unknown sort order '{other}' (expected newest, oldest or priority)"),
            )),
        }
    }
}

/// Filter options for listing issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over title, description, id and reporter name.
    pub search: Option<String>,
    /// `None` keeps the backend order.
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
}

impl ListFilters {
    /// Check a single issue against the filters (sort and limit ignored).
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        if self.status.is_some_and(|s| s != issue.status) {
            return false;
        }
        if self.category.is_some_and(|c| c != issue.category) {
            return false;
        }
        if self.priority.is_some_and(|p| p != issue.priority) {
            return false;
        }
        if let Some(ref needle) = self.search {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() {
                let hit = issue.title.to_lowercase().contains(&needle)
                    || issue.description.to_lowercase().contains(&needle)
                    || issue.id.to_lowercase().contains(&needle)
                    || issue
                        .reporter_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle));
                if !hit {
                    return false;
                }
            }
        }
        true
    }

    /// Filter, sort and truncate a collection.
    #[must_use]
    pub fn apply(&self, issues: Vec<Issue>) -> Vec<Issue> {
        let mut results: Vec<Issue> = issues.into_iter().filter(|i| self.matches(i)).collect();

        if let Some(sort) = self.sort {
            sort_issues(&mut results, sort);
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results
    }
}

fn sort_issues(issues: &mut [Issue], sort: SortOrder) {
    match sort {
        SortOrder::Newest => issues.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => issues.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::Priority => issues.sort_by_key(|i| i.priority.rank()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn make_issue(id: &str, title: &str, priority: Priority, age_days: i64) -> Issue {
        let created = Utc::now() - Duration::days(age_days);
        Issue {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} details"),
            priority,
            created_at: created,
            updated_at: created,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Issue> {
        vec![
            make_issue("ISS-1-AAAAA", "Broken fan", Priority::Low, 3),
            make_issue("ISS-2-BBBBB", "Leaking tap", Priority::High, 1),
            make_issue("ISS-3-CCCCC", "Wifi down", Priority::Medium, 2),
        ]
    }

    #[test]
    fn test_update_tristate_fields() {
        let update: IssueUpdate =
            serde_json::from_str(r#"{"adminNote":null,"location":"Room 4"}"#).unwrap();
        assert_eq!(update.admin_note, Some(None));
        assert_eq!(update.location, Some(Some("Room 4".to_string())));
        assert_eq!(update.reporter_name, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_update_ignores_immutable_fields() {
        let update: IssueUpdate = serde_json::from_str(
            r#"{"createdAt":"2020-01-01T00:00:00Z","resolvedAt":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_no_sort_keeps_backend_order() {
        let ids: Vec<String> = ListFilters::default()
            .apply(sample())
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["ISS-1-AAAAA", "ISS-2-BBBBB", "ISS-3-CCCCC"]);
    }

    #[test]
    fn test_sort_orders() {
        let newest = ListFilters {
            sort: Some(SortOrder::Newest),
            ..Default::default()
        }
        .apply(sample());
        assert_eq!(newest[0].id, "ISS-2-BBBBB");

        let oldest = ListFilters {
            sort: Some(SortOrder::Oldest),
            ..Default::default()
        }
        .apply(sample());
        assert_eq!(oldest[0].id, "ISS-1-AAAAA");

        let by_priority: Vec<Priority> = ListFilters {
            sort: Some(SortOrder::Priority),
            ..Default::default()
        }
        .apply(sample())
        .into_iter()
        .map(|i| i.priority)
        .collect();
        assert_eq!(by_priority, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filters = ListFilters {
            search: Some("WIFI".to_string()),
            ..Default::default()
        };
        let results = filters.apply(sample());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "ISS-3-CCCCC");

        let by_id = ListFilters {
            search: Some("iss-2".to_string()),
            ..Default::default()
        };
        assert_eq!(by_id.apply(sample()).len(), 1);
    }

    #[test]
    fn test_status_filter_and_limit() {
        let mut issues = sample();
        issues[1].status = Status::Resolved;
        let filters = ListFilters {
            status: Some(Status::Pending),
            limit: Some(1),
            ..Default::default()
        };
        let results = filters.apply(issues);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, Status::Pending);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("Priority".parse::<SortOrder>().unwrap(), SortOrder::Priority);
        assert!("alphabetical".parse::<SortOrder>().is_err());
    }
}
