//! Core data types for schoolfix-lib.
//!
//! Serialized with camelCase keys so stored collections stay readable by the
//! web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Issue lifecycle status.
///
/// Any status may move to any other; there is no guarded transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    #[serde(alias = "in_progress", alias = "in-progress")]
    InProgress,
    Resolved,
}

impl Status {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "inprogress",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "inprogress" | "in_progress" | "in-progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(StoreError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Issue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Triage rank: 0 is the most urgent.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(StoreError::InvalidPriority {
                priority: other.to_string(),
            }),
        }
    }
}

/// Facility area an issue belongs to.
///
/// The wire values are the Thai labels shown to reporters; the ASCII
/// slugs are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "อาคารและสถานที่", alias = "building")]
    Building,
    #[serde(rename = "อุปกรณ์และครุภัณฑ์", alias = "equipment")]
    Equipment,
    #[serde(rename = "ความปลอดภัย", alias = "safety")]
    Safety,
    #[serde(rename = "สุขอนามัย", alias = "hygiene")]
    Hygiene,
    #[serde(rename = "ระบบไฟฟ้าและประปา", alias = "utilities")]
    Utilities,
    #[serde(rename = "อินเทอร์เน็ตและคอมพิวเตอร์", alias = "network")]
    Network,
    #[serde(rename = "อื่นๆ", alias = "other")]
    Other,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Building,
        Self::Equipment,
        Self::Safety,
        Self::Hygiene,
        Self::Utilities,
        Self::Network,
        Self::Other,
    ];

    /// Label as stored and shown to users.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Building => "อาคารและสถานที่",
            Self::Equipment => "อุปกรณ์และครุภัณฑ์",
            Self::Safety => "ความปลอดภัย",
            Self::Hygiene => "สุขอนามัย",
            Self::Utilities => "ระบบไฟฟ้าและประปา",
            Self::Network => "อินเทอร์เน็ตและคอมพิวเตอร์",
            Self::Other => "อื่นๆ",
        }
    }

    /// ASCII slug accepted on the command line and in query strings.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Equipment => "equipment",
            Self::Safety => "safety",
            Self::Hygiene => "hygiene",
            Self::Utilities => "utilities",
            Self::Network => "network",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == trimmed || c.slug() == lowered)
            .ok_or_else(|| StoreError::InvalidCategory {
                category: trimmed.to_string(),
            })
    }
}

/// A reported problem and its triage state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Unique ID (e.g., "ISS-1718000000000-K3Z9Q").
    pub id: String,

    pub title: String,

    pub description: String,

    pub category: Category,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_contact: Option<String>,

    /// Where on campus the problem is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// First time the issue reached `resolved`. Never cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

impl Default for Issue {
    fn default() -> Self {
        let now = crate::util::now();
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            category: Category::Other,
            priority: Priority::default(),
            status: Status::default(),
            reporter_name: None,
            reporter_contact: None,
            location: None,
            image_url: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            admin_note: None,
        }
    }
}

/// Submission payload for a new issue.
///
/// Carries no identity, status or timestamps; unknown keys in the incoming
/// JSON (including a client-supplied `status`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueDraft {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub category: Category,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_contact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl IssueDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category,
            priority: Priority::default(),
            reporter_name: None,
            reporter_contact: None,
            location: None,
            image_url: None,
        }
    }
}
